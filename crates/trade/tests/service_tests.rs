use folio_core::config::TradingConfig;
use folio_core::trade::entity::{
    AccountId, OrderRequest, OrderSide, OrderStatus, OrderType, TimeInForce, UserId,
};
use folio_core::trade::port::{TradeError, TradePort};
use folio_market::oracle::StaticOracle;
use folio_store::memory::MemoryLedgerStore;
use folio_trade::service::ExecutionService;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::task::JoinHandle;

fn market_request(account_id: &AccountId, symbol: &str, side: OrderSide, qty: Decimal) -> OrderRequest {
    OrderRequest {
        account_id: account_id.clone(),
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Market,
        time_in_force: TimeInForce::Gtc,
        quantity: qty,
        limit_price: None,
    }
}

/// 组装一套内存账本 + 静态报价的引擎，返回 (服务, 预言机, 用户, 账户)
async fn setup(
    symbol: &str,
    price: Decimal,
    starting_balance: Decimal,
) -> (Arc<ExecutionService>, Arc<StaticOracle>, UserId, AccountId) {
    let ledger = Arc::new(MemoryLedgerStore::new());
    let oracle = Arc::new(StaticOracle::single(symbol, price));
    let service = Arc::new(ExecutionService::new(
        ledger,
        oracle.clone(),
        TradingConfig {
            starting_balance,
            currency: "USD".to_string(),
        },
    ));
    let user = UserId("trader_01".to_string());
    let account = service.open_account(&user, None).await.unwrap();
    (service, oracle, user, account.id)
}

#[tokio::test]
async fn open_account_honors_configured_default_currency() {
    let ledger = Arc::new(MemoryLedgerStore::new());
    let oracle = Arc::new(StaticOracle::single("X", dec!(1.00)));
    let service = ExecutionService::new(
        ledger,
        oracle,
        TradingConfig {
            starting_balance: dec!(5000),
            currency: "EUR".to_string(),
        },
    );
    let user = UserId("trader_eur".to_string());

    // 未指定货币：取配置默认
    let defaulted = service.open_account(&user, None).await.unwrap();
    assert_eq!(defaulted.currency, "EUR");
    assert_eq!(defaulted.balance, dec!(5000));

    // 显式指定货币：覆盖配置默认
    let explicit = service.open_account(&user, Some("JPY")).await.unwrap();
    assert_eq!(explicit.currency, "JPY");
}

#[tokio::test]
async fn market_buy_lifecycle_with_average_cost_and_closure() {
    // 场景 A: 余额 100,000，以 50.00 买入 10 股 X
    let (service, oracle, user, acct) = setup("X", dec!(50.00), dec!(100000)).await;

    let filled = service
        .place_order(&user, market_request(&acct, "X", OrderSide::Buy, dec!(10)))
        .await
        .unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);
    assert_eq!(filled.filled_price, Some(dec!(50.00)));
    assert_eq!(filled.filled_quantity, dec!(10));

    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(99500.00));
    assert_eq!(overview.positions.len(), 1);
    assert_eq!(overview.positions[0].quantity, dec!(10));
    assert_eq!(overview.positions[0].average_price, dec!(50.00));

    // 场景 B: 价格涨到 70.00 再买 10 股，均价加权为 60.00
    oracle.set_price("X", dec!(70.00));
    service
        .place_order(&user, market_request(&acct, "X", OrderSide::Buy, dec!(10)))
        .await
        .unwrap();

    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(98800.00));
    assert_eq!(overview.positions[0].quantity, dec!(20));
    assert_eq!(overview.positions[0].average_price, dec!(60.00));

    // 场景 C: 以 80.00 全部卖出 20 股，仓位精确归零后记录删除，
    // 卖出部分不回算均价 (已实现盈亏刻意不记录)
    oracle.set_price("X", dec!(80.00));
    service
        .place_order(&user, market_request(&acct, "X", OrderSide::Sell, dec!(20)))
        .await
        .unwrap();

    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(100400.00));
    assert!(overview.positions.is_empty(), "归零仓位必须被删除而非保留为 0");
}

#[tokio::test]
async fn insufficient_funds_rejected_before_any_persistence() {
    // 场景 D: 余额 100，预估成本 500，预检直接拒绝且不落订单
    let (service, _oracle, user, acct) = setup("X", dec!(50.00), dec!(100)).await;

    let res = service
        .place_order(&user, market_request(&acct, "X", OrderSide::Buy, dec!(10)))
        .await;
    match res.unwrap_err() {
        TradeError::InsufficientFunds { required, actual } => {
            assert_eq!(required, dec!(500.00));
            assert_eq!(actual, dec!(100));
        }
        other => panic!("错误类型不符: {:?}", other),
    }

    let orders = service.get_orders(&user, &acct).await.unwrap();
    assert!(orders.is_empty(), "预检失败不允许留下任何订单记录");
    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(100));
}

#[tokio::test]
async fn limit_order_rests_pending_without_fill() {
    // 场景 E: 限价买单仅落库 Pending，资金与仓位不动
    let (service, _oracle, user, acct) = setup("X", dec!(50.00), dec!(100000)).await;

    let order = service
        .place_order(
            &user,
            OrderRequest {
                account_id: acct.clone(),
                symbol: "X".to_string(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                time_in_force: TimeInForce::Gtc,
                quantity: dec!(10),
                limit_price: Some(dec!(45.00)),
            },
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.filled_quantity, Decimal::ZERO);
    assert_eq!(order.filled_price, None);

    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(100000));
    assert!(overview.positions.is_empty());

    // 挂起的单子查询可见且保持 Pending
    let orders = service.get_orders(&user, &acct).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
}

#[tokio::test]
async fn identical_requests_create_two_distinct_orders() {
    // 下单不幂等：同参数提交两次产生两笔订单、两次扣款
    let (service, _oracle, user, acct) = setup("X", dec!(50.00), dec!(100000)).await;
    let request = market_request(&acct, "X", OrderSide::Buy, dec!(10));

    let first = service.place_order(&user, request.clone()).await.unwrap();
    let second = service.place_order(&user, request).await.unwrap();

    assert_ne!(first.id, second.id);
    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(99000.00));
    assert_eq!(overview.positions[0].quantity, dec!(20));
}

#[tokio::test]
async fn sell_without_position_opens_short_at_fill_price() {
    let (service, _oracle, user, acct) = setup("X", dec!(25.00), dec!(1000)).await;

    service
        .place_order(&user, market_request(&acct, "X", OrderSide::Sell, dec!(4)))
        .await
        .unwrap();

    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(1100.00));
    assert_eq!(overview.positions[0].quantity, dec!(-4));
    assert_eq!(overview.positions[0].average_price, dec!(25.00));
}

#[tokio::test]
async fn unknown_symbol_fails_with_price_unavailable() {
    let (service, _oracle, user, acct) = setup("X", dec!(50.00), dec!(1000)).await;

    let res = service
        .place_order(&user, market_request(&acct, "NO_SUCH", OrderSide::Buy, dec!(1)))
        .await;
    assert!(matches!(res.unwrap_err(), TradeError::PriceUnavailable(_)));

    let orders = service.get_orders(&user, &acct).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn foreign_account_is_invisible() {
    let (service, _oracle, user, acct) = setup("X", dec!(50.00), dec!(1000)).await;
    let stranger = UserId("intruder".to_string());

    let res = service
        .place_order(&stranger, market_request(&acct, "X", OrderSide::Buy, dec!(1)))
        .await;
    assert!(matches!(res.unwrap_err(), TradeError::AccountNotFound(_)));

    let res = service.get_orders(&stranger, &acct).await;
    assert!(matches!(res.unwrap_err(), TradeError::AccountNotFound(_)));

    // 原户主不受影响
    assert!(service.get_orders(&user, &acct).await.is_ok());
}

#[tokio::test]
async fn non_positive_quantity_rejected_upstream() {
    let (service, _oracle, user, acct) = setup("X", dec!(50.00), dec!(1000)).await;

    for qty in [dec!(0), dec!(-5)] {
        let res = service
            .place_order(&user, market_request(&acct, "X", OrderSide::Buy, qty))
            .await;
        assert!(matches!(res.unwrap_err(), TradeError::InvalidOrder(_)));
    }

    let res = service
        .place_order(
            &user,
            OrderRequest {
                account_id: acct.clone(),
                symbol: "X".to_string(),
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                time_in_force: TimeInForce::Gtc,
                quantity: dec!(1),
                limit_price: None, // 限价单缺限价
            },
        )
        .await;
    assert!(matches!(res.unwrap_err(), TradeError::InvalidOrder(_)));
}

#[tokio::test]
async fn concurrent_buys_never_overdraw_the_account() {
    // 余额只够 20 笔 (20 * 1 * 50 = 1000)，并发抛 100 笔买单：
    // 预检可能被并发打穿，但事务内重检必须保证恰好 20 笔成交、
    // 余额精确清零、绝不为负。
    let (service, _oracle, user, acct) = setup("X", dec!(50.00), dec!(1000)).await;

    let mut handles: Vec<JoinHandle<bool>> = vec![];
    for _ in 0..100 {
        let svc = service.clone();
        let u = user.clone();
        let a = acct.clone();
        handles.push(tokio::spawn(async move {
            svc.place_order(&u, market_request(&a, "X", OrderSide::Buy, dec!(1)))
                .await
                .is_ok()
        }));
    }

    let mut filled = 0;
    for h in handles {
        if h.await.unwrap() {
            filled += 1;
        }
    }

    assert_eq!(filled, 20, "资金只够 20 笔成交");
    let overview = &service.get_accounts(&user).await.unwrap()[0];
    assert_eq!(overview.account.balance, dec!(0.00));
    assert!(overview.account.balance >= Decimal::ZERO, "余额绝不允许为负");
    assert_eq!(overview.positions[0].quantity, dec!(20));

    let orders = service.get_orders(&user, &acct).await.unwrap();
    assert_eq!(orders.len(), 20, "被拒绝的请求不留订单记录");
}
