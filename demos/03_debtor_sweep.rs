/// debtor sweep - overdue contracts become debtors until paid
use nasiya_ledger::{
    Contract, Employee, LedgerConfig, LedgerService, Money, Role, SafeTimeProvider, SweepSchedule,
    TimeSource, Uuid,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== debtor sweep example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()));
    let config = LedgerConfig::default();
    let service = LedgerService::in_memory(config.clone());
    let manager = service.register_employee(Employee::new("Dilnoza", "Rahimova", Role::Manager))?;
    let mut schedule = SweepSchedule::new(config.sweep, time.now())?;

    for product in ["tv", "sofa"] {
        let terms = Contract::builder()
            .customer_id(Uuid::new_v4())
            .product_name(product)
            .total_price(Money::from_major(900))
            .monthly_payment(Money::from_major(150))
            .period(6)
            .build(&time)?;
        service.create_contract(terms, manager, &time)?;
    }

    // a day at a time for fifty days
    for _ in 0..50 {
        time.test_control().unwrap().advance(Duration::days(1));
        if let Some(report) = service.run_scheduled_sweep(&mut schedule, &time)? {
            if report.created > 0 {
                println!("{}: {} new debtors", time.now().format("%Y-%m-%d"), report.created);
            }
        }
    }

    for debtor in service.debtors() {
        println!("debtor {} owes {}, {} days overdue", debtor.id, debtor.debt_amount, debtor.overdue_days);
        let receipt = service.pay_debtor(debtor.id, debtor.debt_amount, None, manager, &time)?;
        println!("  paid: {}", receipt.message);
    }
    println!("\ndebtors left: {}", service.debtors().len());
    Ok(())
}
