//! Status report built from a live controller.

mod common;

use std::sync::Arc;

use common::{OpenLedger, START, SUPPLY, StaticMarket, UnitReference};
use peg_core::{PegController, PegControllerBuilder};
use peg_infra::report::{EXIT_ACTIVE, EXIT_COOLING, EXIT_HALTED, StatusReport, exit_code};

fn controller(price: u128) -> PegController {
    PegControllerBuilder::new(
        Arc::new(StaticMarket::new(price)),
        Arc::new(UnitReference),
        Arc::new(OpenLedger::new(SUPPLY)),
    )
    .build(START)
    .unwrap()
}

#[test]
fn test_fresh_controller_reports_active() {
    let controller = controller(103_000_000);
    let report = StatusReport::capture(&controller, START);

    assert!(report.active);
    assert_eq!(report.next_eligible_time, None);
    assert_eq!(report.current_deviation_bp, 300);
    assert_eq!(report.daily_remaining_bp, 200);
    assert_eq!(exit_code(&report), EXIT_ACTIVE);
}

#[test]
fn test_cooling_then_halted_exit_codes() {
    let controller = controller(103_000_000);
    controller.stabilize(START).unwrap();

    let report = StatusReport::capture(&controller, START + 60);
    assert_eq!(exit_code(&report), EXIT_COOLING);
    assert_eq!(report.action_count, 1);
    assert_eq!(report.total_minted, 4_666_500_000);

    controller.halt("manual").unwrap();
    let report = StatusReport::capture(&controller, START + 60);
    assert_eq!(exit_code(&report), EXIT_HALTED);

    // Halted wins even after the cooldown has elapsed.
    let report = StatusReport::capture(&controller, START + 100_000);
    assert_eq!(exit_code(&report), EXIT_HALTED);
}

#[test]
fn test_report_json_shape() {
    let controller = controller(103_000_000);
    controller.stabilize(START).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&StatusReport::capture(&controller, START).to_json().unwrap())
            .unwrap();
    assert_eq!(json["active"], false);
    assert_eq!(json["halted"], false);
    assert_eq!(json["next_eligible_time"], START + 23_400);
    assert_eq!(json["daily_remaining_bp"], 153);
    assert_eq!(json["total_minted"], "4666500000");
    assert_eq!(json["total_burned"], "0");
    assert_eq!(json["action_count"], 1);
}
