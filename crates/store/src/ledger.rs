use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use folio_core::trade::averager::{self, FillOutcome, Lot};
use folio_core::trade::entity::{
    Account, AccountId, AccountKind, AccountOverview, Order, OrderId, OrderSide, OrderStatus,
    OrderType, Position, PositionSource, TimeInForce, UserId,
};
use folio_core::trade::port::{LedgerPort, TradeError};
use rust_decimal::Decimal;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// # Summary
/// `LedgerPort` 的 SQLite 实现，采用"一户一库"策略
/// (`ledger/ledger_<user_id>.db`) 规避 SQLite 的全库写锁瓶颈。
/// 金额与数量一律以 TEXT 形式存储 Decimal 的十进制字符串，杜绝浮点误差。
///
/// # Invariants
/// - 连接池按 user_id 缓存。
/// - `execute_market_fill` 的全部写入发生在单个事务内；
///   买方资金校验在事务内重做，并发透支在提交点被拒绝。
pub struct SqliteLedgerStore {
    base_path: PathBuf,
    pools: DashMap<String, SqlitePool>,
}

impl SqliteLedgerStore {
    pub fn new() -> Result<Self, TradeError> {
        let base_path = crate::config::data_dir().join("ledger");
        if !base_path.exists() {
            std::fs::create_dir_all(&base_path)
                .map_err(|e| TradeError::TransactionFailure(format!("创建账本目录失败: {}", e)))?;
        }
        Ok(Self {
            base_path,
            pools: DashMap::new(),
        })
    }

    async fn get_or_init_pool(&self, user_id: &str) -> Result<SqlitePool, TradeError> {
        if let Some(pool) = self.pools.get(user_id) {
            return Ok(pool.clone());
        }

        let db_path = self.base_path.join(format!("ledger_{}.db", user_id));
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                currency TEXT NOT NULL,
                balance TEXT NOT NULL,
                locked_balance TEXT NOT NULL,
                created_at DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS positions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                quantity TEXT NOT NULL,
                average_price TEXT NOT NULL,
                source TEXT NOT NULL,
                confidence TEXT,
                verified_at DATETIME,
                import_batch TEXT,
                asset_class TEXT,
                broker TEXT,
                updated_at DATETIME NOT NULL,
                UNIQUE (account_id, symbol)
            );

            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                order_type TEXT NOT NULL,
                time_in_force TEXT NOT NULL,
                quantity TEXT NOT NULL,
                filled_quantity TEXT NOT NULL,
                limit_price TEXT,
                stop_price TEXT,
                status TEXT NOT NULL,
                filled_price TEXT,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_orders_account_created
                ON orders (account_id, created_at DESC);
            "#,
        )
        .execute(&pool)
        .await
        .map_err(db_err)?;

        self.pools.insert(user_id.to_string(), pool.clone());
        Ok(pool)
    }
}

fn db_err(e: sqlx::Error) -> TradeError {
    TradeError::TransactionFailure(e.to_string())
}

fn side_to_str(s: OrderSide) -> &'static str {
    match s {
        OrderSide::Buy => "Buy",
        OrderSide::Sell => "Sell",
    }
}

fn str_to_side(s: &str) -> OrderSide {
    match s {
        "Sell" => OrderSide::Sell,
        _ => OrderSide::Buy,
    }
}

fn type_to_str(t: OrderType) -> &'static str {
    match t {
        OrderType::Market => "Market",
        OrderType::Limit => "Limit",
    }
}

fn str_to_type(s: &str) -> OrderType {
    match s {
        "Limit" => OrderType::Limit,
        _ => OrderType::Market,
    }
}

fn tif_to_str(t: TimeInForce) -> &'static str {
    match t {
        TimeInForce::Gtc => "Gtc",
        TimeInForce::Day => "Day",
    }
}

fn str_to_tif(s: &str) -> TimeInForce {
    match s {
        "Day" => TimeInForce::Day,
        _ => TimeInForce::Gtc,
    }
}

fn status_to_str(s: OrderStatus) -> &'static str {
    match s {
        OrderStatus::Pending => "Pending",
        OrderStatus::Filled => "Filled",
        OrderStatus::Cancelled => "Cancelled",
        OrderStatus::Rejected => "Rejected",
    }
}

fn str_to_status(s: &str) -> OrderStatus {
    match s {
        "Filled" => OrderStatus::Filled,
        "Cancelled" => OrderStatus::Cancelled,
        "Rejected" => OrderStatus::Rejected,
        _ => OrderStatus::Pending,
    }
}

fn kind_to_str(k: AccountKind) -> &'static str {
    match k {
        AccountKind::Paper => "Paper",
        AccountKind::Live => "Live",
    }
}

fn str_to_kind(s: &str) -> AccountKind {
    match s {
        "Live" => AccountKind::Live,
        _ => AccountKind::Paper,
    }
}

fn source_to_str(s: PositionSource) -> &'static str {
    match s {
        PositionSource::Manual => "Manual",
        PositionSource::AiImport => "AiImport",
        PositionSource::ApiLinked => "ApiLinked",
    }
}

fn str_to_source(s: &str) -> PositionSource {
    match s {
        "AiImport" => PositionSource::AiImport,
        "ApiLinked" => PositionSource::ApiLinked,
        _ => PositionSource::Manual,
    }
}

fn parse_dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or_default()
}

type OrderRow = (
    String,                // id
    String,                // account_id
    String,                // symbol
    String,                // side
    String,                // order_type
    String,                // time_in_force
    String,                // quantity
    String,                // filled_quantity
    Option<String>,        // limit_price
    Option<String>,        // stop_price
    String,                // status
    Option<String>,        // filled_price
    DateTime<Utc>,         // created_at
);

const ORDER_COLUMNS: &str = "id, account_id, symbol, side, order_type, time_in_force, \
     quantity, filled_quantity, limit_price, stop_price, status, filled_price, created_at";

fn row_to_order(row: OrderRow) -> Order {
    Order {
        id: OrderId(row.0),
        account_id: AccountId(row.1),
        symbol: row.2,
        side: str_to_side(&row.3),
        order_type: str_to_type(&row.4),
        time_in_force: str_to_tif(&row.5),
        quantity: parse_dec(&row.6),
        filled_quantity: parse_dec(&row.7),
        limit_price: row.8.as_deref().map(parse_dec),
        stop_price: row.9.as_deref().map(parse_dec),
        status: str_to_status(&row.10),
        filled_price: row.11.as_deref().map(parse_dec),
        created_at: row.12,
    }
}

type PositionRow = (
    String,                // id
    String,                // account_id
    String,                // symbol
    String,                // quantity
    String,                // average_price
    String,                // source
    Option<String>,        // confidence
    Option<DateTime<Utc>>, // verified_at
    Option<String>,        // import_batch
    Option<String>,        // asset_class
    Option<String>,        // broker
);

const POSITION_COLUMNS: &str = "id, account_id, symbol, quantity, average_price, source, \
     confidence, verified_at, import_batch, asset_class, broker";

fn row_to_position(row: PositionRow) -> Position {
    Position {
        id: row.0,
        account_id: AccountId(row.1),
        symbol: row.2,
        quantity: parse_dec(&row.3),
        average_price: parse_dec(&row.4),
        source: str_to_source(&row.5),
        confidence: row.6.as_deref().map(parse_dec),
        verified_at: row.7,
        import_batch: row.8,
        asset_class: row.9,
        broker: row.10,
    }
}

type AccountRow = (
    String,        // id
    String,        // user_id
    String,        // kind
    String,        // currency
    String,        // balance
    String,        // locked_balance
    DateTime<Utc>, // created_at
);

fn row_to_account(row: AccountRow) -> Account {
    Account {
        id: AccountId(row.0),
        user_id: UserId(row.1),
        kind: str_to_kind(&row.2),
        currency: row.3,
        balance: parse_dec(&row.4),
        locked_balance: parse_dec(&row.5),
        created_at: row.6,
    }
}

#[async_trait]
impl LedgerPort for SqliteLedgerStore {
    async fn create_account(&self, account: &Account) -> Result<(), TradeError> {
        let pool = self.get_or_init_pool(&account.user_id.0).await?;
        sqlx::query(
            r#"
            INSERT INTO accounts (id, user_id, kind, currency, balance, locked_balance, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id.0)
        .bind(&account.user_id.0)
        .bind(kind_to_str(account.kind))
        .bind(&account.currency)
        .bind(account.balance.to_string())
        .bind(account.locked_balance.to_string())
        .bind(account.created_at)
        .execute(&pool)
        .await
        .map_err(db_err)?;

        info!("开户完成: user={} account={}", account.user_id.0, account.id.0);
        Ok(())
    }

    async fn find_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Option<Account>, TradeError> {
        let pool = self.get_or_init_pool(&user_id.0).await?;
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, user_id, kind, currency, balance, locked_balance, created_at \
             FROM accounts WHERE id = ? AND user_id = ?",
        )
        .bind(&account_id.0)
        .bind(&user_id.0)
        .fetch_optional(&pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(row_to_account))
    }

    async fn accounts_of_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AccountOverview>, TradeError> {
        let pool = self.get_or_init_pool(&user_id.0).await?;
        let rows: Vec<AccountRow> = sqlx::query_as(
            "SELECT id, user_id, kind, currency, balance, locked_balance, created_at \
             FROM accounts WHERE user_id = ? ORDER BY created_at",
        )
        .bind(&user_id.0)
        .fetch_all(&pool)
        .await
        .map_err(db_err)?;

        let mut overviews = Vec::with_capacity(rows.len());
        for row in rows {
            let account = row_to_account(row);
            let positions: Vec<PositionRow> = sqlx::query_as(&format!(
                "SELECT {} FROM positions WHERE account_id = ? ORDER BY symbol",
                POSITION_COLUMNS
            ))
            .bind(&account.id.0)
            .fetch_all(&pool)
            .await
            .map_err(db_err)?;

            overviews.push(AccountOverview {
                account,
                positions: positions.into_iter().map(row_to_position).collect(),
            });
        }
        Ok(overviews)
    }

    async fn insert_order(&self, user_id: &UserId, order: &Order) -> Result<(), TradeError> {
        let pool = self.get_or_init_pool(&user_id.0).await?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, account_id, symbol, side, order_type, time_in_force,
                quantity, filled_quantity, limit_price, stop_price, status, filled_price, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id.0)
        .bind(&order.account_id.0)
        .bind(&order.symbol)
        .bind(side_to_str(order.side))
        .bind(type_to_str(order.order_type))
        .bind(tif_to_str(order.time_in_force))
        .bind(order.quantity.to_string())
        .bind(order.filled_quantity.to_string())
        .bind(order.limit_price.map(|p| p.to_string()))
        .bind(order.stop_price.map(|p| p.to_string()))
        .bind(status_to_str(order.status))
        .bind(order.filled_price.map(|p| p.to_string()))
        .bind(order.created_at)
        .execute(&pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// # Logic
    /// 市价单的原子成交序列，全程在单个 SQLite 事务内：
    /// 1. 锁定读出账户余额 (事务内重做买方资金校验——预检与落库之间
    ///    被并发扣干的余额在这里拒绝，绝不透支)。
    /// 2. 订单以 Filled 终态落库，成交价取引擎在校验时刻拿到的参考价。
    /// 3. 余额按 `price * filled_quantity` 借贷。
    /// 4. 仓位按成交量加权摊薄后写回；数量精确归零则删除记录。
    /// 5. 提交。任何一步失败，事务随 drop 回滚，不留孤儿订单或脏余额。
    async fn execute_market_fill(
        &self,
        user_id: &UserId,
        order: &Order,
        price: Decimal,
    ) -> Result<Order, TradeError> {
        let pool = self.get_or_init_pool(&user_id.0).await?;
        let mut tx = pool.begin().await.map_err(db_err)?;

        // 1. 事务内读余额并重做资金校验
        let account: Option<(String,)> = sqlx::query_as(
            "SELECT balance FROM accounts WHERE id = ? AND user_id = ?",
        )
        .bind(&order.account_id.0)
        .bind(&user_id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let balance = match account {
            Some((raw,)) => parse_dec(&raw),
            None => return Err(TradeError::AccountNotFound(order.account_id.0.clone())),
        };

        let gross = averager::estimated_cost(order.quantity, price);
        if order.side == OrderSide::Buy && balance < gross {
            return Err(TradeError::InsufficientFunds {
                required: gross,
                actual: balance,
            });
        }

        // 2. 订单以 Filled 落库
        let mut filled = order.clone();
        filled.status = OrderStatus::Filled;
        filled.filled_quantity = order.quantity;
        filled.filled_price = Some(price);

        sqlx::query(
            r#"
            INSERT INTO orders (id, account_id, symbol, side, order_type, time_in_force,
                quantity, filled_quantity, limit_price, stop_price, status, filled_price, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&filled.id.0)
        .bind(&filled.account_id.0)
        .bind(&filled.symbol)
        .bind(side_to_str(filled.side))
        .bind(type_to_str(filled.order_type))
        .bind(tif_to_str(filled.time_in_force))
        .bind(filled.quantity.to_string())
        .bind(filled.filled_quantity.to_string())
        .bind(filled.limit_price.map(|p| p.to_string()))
        .bind(filled.stop_price.map(|p| p.to_string()))
        .bind(status_to_str(filled.status))
        .bind(price.to_string())
        .bind(filled.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        // 3. 余额借贷
        let new_balance = balance + averager::balance_delta(order.side, filled.filled_quantity, price);
        sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
            .bind(new_balance.to_string())
            .bind(&order.account_id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        // 4. 仓位摊薄
        let existing: Option<(String, String)> = sqlx::query_as(
            "SELECT quantity, average_price FROM positions WHERE account_id = ? AND symbol = ?",
        )
        .bind(&order.account_id.0)
        .bind(&order.symbol)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let lot = existing.map(|(qty, avg)| Lot {
            quantity: parse_dec(&qty),
            average_price: parse_dec(&avg),
        });

        match averager::apply_fill(lot, order.side, filled.filled_quantity, price) {
            FillOutcome::Upsert(next) => {
                sqlx::query(
                    r#"
                    INSERT INTO positions (id, account_id, symbol, quantity, average_price, source, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT (account_id, symbol) DO UPDATE SET
                        quantity = excluded.quantity,
                        average_price = excluded.average_price,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(uuid::Uuid::new_v4().to_string())
                .bind(&order.account_id.0)
                .bind(&order.symbol)
                .bind(next.quantity.to_string())
                .bind(next.average_price.to_string())
                .bind(source_to_str(PositionSource::Manual))
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
            FillOutcome::Close => {
                sqlx::query("DELETE FROM positions WHERE account_id = ? AND symbol = ?")
                    .bind(&order.account_id.0)
                    .bind(&order.symbol)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
            }
        }

        // 5. 提交
        tx.commit().await.map_err(db_err)?;
        Ok(filled)
    }

    async fn orders_of_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Order>, TradeError> {
        let pool = self.get_or_init_pool(&user_id.0).await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE account_id = ? ORDER BY created_at DESC, rowid DESC",
            ORDER_COLUMNS
        ))
        .bind(&account_id.0)
        .fetch_all(&pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(row_to_order).collect())
    }

    async fn find_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Option<Order>, TradeError> {
        let pool = self.get_or_init_pool(&user_id.0).await?;
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = ?",
            ORDER_COLUMNS
        ))
        .bind(&order_id.0)
        .fetch_optional(&pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(row_to_order))
    }

    async fn positions_of_account(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Position>, TradeError> {
        let pool = self.get_or_init_pool(&user_id.0).await?;
        let rows: Vec<PositionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM positions WHERE account_id = ? ORDER BY symbol",
            POSITION_COLUMNS
        ))
        .bind(&account_id.0)
        .fetch_all(&pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(row_to_position).collect())
    }
}
