use chrono::Utc;
use folio_core::trade::entity::{
    Account, AccountId, AccountKind, Order, OrderId, OrderRequest, OrderSide, OrderStatus,
    OrderType, TimeInForce, UserId,
};
use folio_core::trade::port::{LedgerPort, TradeError};
use folio_store::ledger::SqliteLedgerStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, OnceLock};

static TEST_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

/// 所有用例共享一个临时数据根目录，用户 ID 彼此隔离 (一户一库)
fn init_data_dir() {
    let dir = TEST_DIR.get_or_init(|| tempfile::tempdir().expect("Failed to create temp dir"));
    folio_store::config::set_data_dir(dir.path().to_path_buf());
}

fn paper_account(user: &UserId, balance: Decimal) -> Account {
    Account {
        id: AccountId(uuid::Uuid::new_v4().to_string()),
        user_id: user.clone(),
        kind: AccountKind::Paper,
        currency: "USD".to_string(),
        balance,
        locked_balance: Decimal::ZERO,
        created_at: Utc::now(),
    }
}

fn market_order(account_id: &AccountId, symbol: &str, side: OrderSide, qty: Decimal) -> Order {
    let request = OrderRequest {
        account_id: account_id.clone(),
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Market,
        time_in_force: TimeInForce::Gtc,
        quantity: qty,
        limit_price: None,
    };
    Order::from_request(OrderId(uuid::Uuid::new_v4().to_string()), &request, Utc::now())
}

#[tokio::test]
async fn market_fill_updates_balance_position_and_order_log() {
    init_data_dir();
    let store = SqliteLedgerStore::new().expect("Failed to create store");
    let user = UserId("it_user_fill".to_string());
    let account = paper_account(&user, dec!(100000));
    store.create_account(&account).await.unwrap();

    // 第一笔: 10 @ 50
    let filled = store
        .execute_market_fill(&user, &market_order(&account.id, "X", OrderSide::Buy, dec!(10)), dec!(50.00))
        .await
        .unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);
    assert_eq!(filled.filled_price, Some(dec!(50.00)));

    // 第二笔: 10 @ 70，加权均价 60
    store
        .execute_market_fill(&user, &market_order(&account.id, "X", OrderSide::Buy, dec!(10)), dec!(70.00))
        .await
        .unwrap();

    let reloaded = store.find_account(&user, &account.id).await.unwrap().unwrap();
    assert_eq!(reloaded.balance, dec!(98800.00));

    let positions = store.positions_of_account(&user, &account.id).await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, dec!(20));
    assert_eq!(positions[0].average_price, dec!(60.00));

    // 全部卖出: 20 @ 80，仓位记录删除，余额入账
    store
        .execute_market_fill(&user, &market_order(&account.id, "X", OrderSide::Sell, dec!(20)), dec!(80.00))
        .await
        .unwrap();

    let reloaded = store.find_account(&user, &account.id).await.unwrap().unwrap();
    assert_eq!(reloaded.balance, dec!(100400.00));
    let positions = store.positions_of_account(&user, &account.id).await.unwrap();
    assert!(positions.is_empty(), "归零仓位必须物理删除");

    // 订单流水按创建时间倒序
    let orders = store.orders_of_account(&user, &account.id).await.unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[0].side, OrderSide::Sell);
    assert!(orders.iter().all(|o| o.status == OrderStatus::Filled));
}

#[tokio::test]
async fn in_transaction_recheck_rejects_overdraw_atomically() {
    init_data_dir();
    let store = SqliteLedgerStore::new().expect("Failed to create store");
    let user = UserId("it_user_overdraw".to_string());
    let account = paper_account(&user, dec!(400));
    store.create_account(&account).await.unwrap();

    // 模拟预检后余额被并发抽干的场景：直接请求一笔超额成交。
    // 事务内重检必须拒绝，且不留下任何部分状态。
    let res = store
        .execute_market_fill(&user, &market_order(&account.id, "X", OrderSide::Buy, dec!(10)), dec!(50.00))
        .await;
    match res.unwrap_err() {
        TradeError::InsufficientFunds { required, actual } => {
            assert_eq!(required, dec!(500.00));
            assert_eq!(actual, dec!(400));
        }
        other => panic!("错误类型不符: {:?}", other),
    }

    let reloaded = store.find_account(&user, &account.id).await.unwrap().unwrap();
    assert_eq!(reloaded.balance, dec!(400), "失败路径不得触碰余额");
    let orders = store.orders_of_account(&user, &account.id).await.unwrap();
    assert!(orders.is_empty(), "失败路径不得留下孤儿订单");
    let positions = store.positions_of_account(&user, &account.id).await.unwrap();
    assert!(positions.is_empty());
}

#[tokio::test]
async fn pending_limit_order_round_trips_all_fields() {
    init_data_dir();
    let store = SqliteLedgerStore::new().expect("Failed to create store");
    let user = UserId("it_user_limit".to_string());
    let account = paper_account(&user, dec!(1000));
    store.create_account(&account).await.unwrap();

    let request = OrderRequest {
        account_id: account.id.clone(),
        symbol: "NVDA".to_string(),
        side: OrderSide::Buy,
        order_type: OrderType::Limit,
        time_in_force: TimeInForce::Day,
        quantity: dec!(2.5),
        limit_price: Some(dec!(120.55)),
    };
    let order = Order::from_request(OrderId("lim_1".to_string()), &request, Utc::now());
    store.insert_order(&user, &order).await.unwrap();

    let loaded = store.find_order(&user, &order.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Pending);
    assert_eq!(loaded.order_type, OrderType::Limit);
    assert_eq!(loaded.time_in_force, TimeInForce::Day);
    assert_eq!(loaded.quantity, dec!(2.5));
    assert_eq!(loaded.filled_quantity, Decimal::ZERO);
    assert_eq!(loaded.limit_price, Some(dec!(120.55)));
    assert_eq!(loaded.filled_price, None);
}

#[tokio::test]
async fn ownership_scoping_hides_foreign_accounts() {
    init_data_dir();
    let store = SqliteLedgerStore::new().expect("Failed to create store");
    let owner = UserId("it_user_owner".to_string());
    let stranger = UserId("it_user_stranger".to_string());
    let account = paper_account(&owner, dec!(1000));
    store.create_account(&account).await.unwrap();

    assert!(store.find_account(&owner, &account.id).await.unwrap().is_some());
    assert!(store.find_account(&stranger, &account.id).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_fills_serialize_without_lost_updates() {
    init_data_dir();
    let store = Arc::new(SqliteLedgerStore::new().expect("Failed to create store"));
    let user = UserId("it_user_concurrent".to_string());
    let account = paper_account(&user, dec!(1000));
    store.create_account(&account).await.unwrap();

    // 50 笔并发买单，每笔 1 股 @ 14。总花费 700，余额必须精确剩 300。
    let mut handles = vec![];
    for _ in 0..50 {
        let store_clone = store.clone();
        let u = user.clone();
        let a = account.id.clone();
        handles.push(tokio::spawn(async move {
            store_clone
                .execute_market_fill(&u, &market_order(&a, "AAPL", OrderSide::Buy, dec!(1)), dec!(14.00))
                .await
                .expect("Trade DB Error");
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let reloaded = store.find_account(&user, &account.id).await.unwrap().unwrap();
    assert_eq!(reloaded.balance, dec!(300.00));
    let positions = store.positions_of_account(&user, &account.id).await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].quantity, dec!(50));
    let orders = store.orders_of_account(&user, &account.id).await.unwrap();
    assert_eq!(orders.len(), 50);
}
