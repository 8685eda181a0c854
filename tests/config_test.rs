// ==========================================
// 配置集成测试
// ==========================================
// 职责: config_kv → ConfigManager → 引擎参数 / 调度节奏
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use classgen::config::{config_keys, ClassGenConfigReader, ConfigManager};
use classgen::scheduler::MonthlyCadence;
use classgen::GenerationSettings;
use test_helpers::{create_test_db, create_test_state};

#[test]
fn test_config_manager_from_db_path() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let config = ConfigManager::new(&db_path).unwrap();

    assert_eq!(config.get_global_config_value(config_keys::TIMEZONE).unwrap(), None);
    config.set_global_config_value(config_keys::TIMEZONE, "America/Santiago").unwrap();

    // 另一个连接可见
    let reopened = ConfigManager::new(&db_path).unwrap();
    assert_eq!(reopened.timezone().unwrap(), chrono_tz::America::Santiago);
}

#[test]
fn test_settings_flow_into_engines() {
    let (_tmp, state) = create_test_state();
    state.config.set_global_config_value(config_keys::ONBOARDING_MONTHS, "3").unwrap();
    state.config.set_global_config_value(config_keys::MAX_ITEM_RETRIES, "4").unwrap();
    state.config.set_global_config_value(config_keys::BACKFILL_FROM_LAST_RUN, "true").unwrap();

    let engine = state.generation_engine().unwrap();
    assert_eq!(
        engine.settings(),
        &GenerationSettings {
            onboarding_months: 3,
            max_item_retries: 4,
            backfill_from_last_run: true,
        }
    );
}

#[test]
fn test_cadence_from_config() {
    let (_tmp, state) = create_test_state();

    let cadence = MonthlyCadence::from_config(state.config.as_ref()).unwrap();
    assert_eq!(cadence, MonthlyCadence::new(10, 2, chrono_tz::America::La_Paz));

    state.config.set_global_config_value(config_keys::MONTHLY_RUN_DAY, "1").unwrap();
    state.config.set_global_config_value(config_keys::MONTHLY_RUN_HOUR, "99").unwrap();
    let cadence = MonthlyCadence::from_config(state.config.as_ref()).unwrap();
    assert_eq!(cadence.day, 1);
    assert_eq!(cadence.hour, 23);
}

#[test]
fn test_zero_onboarding_months_is_raised_to_one() {
    let (_tmp, state) = create_test_state();
    state.config.set_global_config_value(config_keys::ONBOARDING_MONTHS, "0").unwrap();
    assert_eq!(state.config.onboarding_months().unwrap(), 1);
}
