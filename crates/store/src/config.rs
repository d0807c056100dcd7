use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// 设置存储层的数据根目录。
///
/// # Logic
/// 1. 尝试将指定的路径保存到全局静态变量中。
/// 2. 如果已经设置过，则本次设置无效。
pub fn set_data_dir(path: PathBuf) {
    let _set = DATA_DIR.set(path);
}

/// 获取当前配置的数据根目录，未设置时回落到 "data"。
pub(crate) fn data_dir() -> PathBuf {
    DATA_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("data"))
}
