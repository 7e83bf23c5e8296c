/// quick start - one contract paid off at the dashboard
use nasiya_ledger::{
    init_tracing, Contract, Employee, LedgerConfig, LedgerService, Money, PaymentRequest, Role,
    SafeTimeProvider, TimeSource, Uuid,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()));
    let service = LedgerService::in_memory(LedgerConfig::default());
    let manager = service.register_employee(Employee::new("Dilnoza", "Rahimova", Role::Manager))?;

    // a $1,200 fridge, $200 down, 10 months of $100
    let terms = Contract::builder()
        .customer_id(Uuid::new_v4())
        .product_name("fridge")
        .total_price(Money::from_major(1_200))
        .initial_payment(Money::from_major(200))
        .period(10)
        .build(&time)?;
    let contract = service.create_contract(terms, manager, &time)?;
    println!("monthly payment: {}", contract.monthly_payment);

    for _ in 0..10 {
        let receipt = service.receive_payment(
            PaymentRequest::dashboard(contract.id, contract.monthly_payment),
            manager,
            &time,
        )?;
        println!("{} -> next due {}", receipt.message, receipt.next_payment_date.format("%Y-%m-%d"));
        time.test_control().unwrap().advance(Duration::days(30));
    }

    println!("{}", service.contract_view(contract.id)?.to_json_pretty()?);
    Ok(())
}
