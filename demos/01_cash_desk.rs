/// cash desk - bot payments wait for confirmation or rejection
use nasiya_ledger::{
    CashSplit, Contract, Employee, LedgerConfig, LedgerService, Money, PaymentRequest, Role, SafeTimeProvider,
    TimeSource, Uuid,
};
use chrono::{TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== cash desk example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()));
    let service = LedgerService::in_memory(LedgerConfig::default());
    let manager = service.register_employee(Employee::new("Dilnoza", "Rahimova", Role::Manager))?;
    let kassa = service.register_employee(Employee::new("Bekzod", "Tursunov", Role::Kassa))?;

    let terms = Contract::builder()
        .customer_id(Uuid::new_v4())
        .product_name("phone")
        .total_price(Money::from_major(600))
        .monthly_payment(Money::from_major(100))
        .period(6)
        .build(&time)?;
    let contract = service.create_contract(terms, manager, &time)?;

    // the bot reports two payments, the first handed over in both currencies
    let cash = CashSplit {
        dollar: Money::parse_amount("$30")?,
        sum: Money::parse_amount("625 000 so'm")?,
    };
    let short = service.receive_payment(
        PaymentRequest::bot(contract.id, Money::from_major(80)).with_cash(cash),
        manager,
        &time,
    )?;
    let fake = service.receive_payment(PaymentRequest::bot(contract.id, Money::from_major(100)), manager, &time)?;

    println!("pending at the cash desk:");
    for row in service.pending_payments() {
        println!("  {} {} from {} ({:?})", row.payment_id, row.actual, row.manager_name, row.classified_as);
    }

    // one is real but short, the other never arrived
    let confirmed = service.confirm_payment(short.payment_id, kassa, &time)?;
    println!("\nconfirmed: {}", confirmed.message);
    service.reject_payment(fake.payment_id, "no cash received", kassa, &time)?;
    println!("rejected: {}", fake.payment_id);

    // the shortfall is settled later
    if let Some(extra) = confirmed.corrective_payment_id {
        let receipt = service.pay_remaining(extra, Money::from_major(20), manager, &time)?;
        println!("remaining paid, entry now {:?}", receipt.status);
    }

    if let Some(balance) = service.balance(manager) {
        println!("\nmanager balance: {} $ / {} sum", balance.dollar, balance.sum);
    }
    if let Some(total) = service.cash_on_hand(manager) {
        println!("cash on hand: {} $", total);
    }
    for event in service.take_events() {
        println!("event: {:?}", event);
    }
    Ok(())
}
