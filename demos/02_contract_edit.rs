/// contract edit - preview and apply a monthly payment change
use nasiya_ledger::{
    Contract, ContractUpdate, Employee, LedgerConfig, LedgerService, Money, PaymentRequest, Role,
    SafeTimeProvider, TimeSource, Uuid,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== contract edit example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()));
    let service = LedgerService::in_memory(LedgerConfig::default());
    let manager = service.register_employee(Employee::new("Dilnoza", "Rahimova", Role::Manager))?;

    let terms = Contract::builder()
        .customer_id(Uuid::new_v4())
        .product_name("laptop")
        .total_price(Money::from_major(1_200))
        .monthly_payment(Money::from_major(100))
        .period(12)
        .build(&time)?;
    let contract = service.create_contract(terms, manager, &time)?;

    for amount in [100, 150, 100] {
        service.receive_payment(PaymentRequest::dashboard(contract.id, Money::from_major(amount)), manager, &time)?;
        time.test_control().unwrap().advance(Duration::days(31));
    }

    let update = ContractUpdate::default().monthly_payment(Money::from_major(120));
    let preview = service.analyze_contract_edit_impact(contract.id, &update)?;
    println!("preview:");
    for outcome in &preview.outcomes {
        println!(
            "  {} {:?} -> {:?} (carry in {}, remaining {}, excess {})",
            outcome.payment_id,
            outcome.old_status,
            outcome.new_status,
            outcome.carry_in,
            outcome.remaining,
            outcome.excess
        );
    }
    println!("  prepaid balance after edit: {}", preview.prepaid_balance);

    let applied = service.update_contract(contract.id, update, manager, &time)?;
    println!("\napplied: {:?}", applied.impact);
    println!("{}", service.contract_view(contract.id)?.to_json_pretty()?);
    Ok(())
}
