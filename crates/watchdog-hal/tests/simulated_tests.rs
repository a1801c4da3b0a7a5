//! Integration tests for the simulated watchdog peripheral.

use mbed_watchdog_hal::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

mod lifecycle {
    use super::*;

    #[test]
    fn test_initial_state_is_stopped() -> TestResult {
        let wdt = SimulatedWatchdog::default();
        assert_eq!(wdt.status(), PeripheralStatus::Stopped);
        assert!(!wdt.is_running());
        assert_eq!(wdt.remaining_ms(), 0);
        Ok(())
    }

    #[test]
    fn test_init_starts_countdown() -> TestResult {
        let mut wdt = SimulatedWatchdog::default();
        wdt.init(&HalConfig::new(500))?;
        assert_eq!(wdt.status(), PeripheralStatus::Running);
        assert_eq!(wdt.reload_value(), 500);
        assert_eq!(wdt.remaining_ms(), 500);
        Ok(())
    }

    #[test]
    fn test_stop_restart_expires_without_kick() -> TestResult {
        let mut wdt = SimulatedWatchdog::default();
        wdt.init(&HalConfig::new(500))?;
        wdt.stop()?;
        wdt.init(&HalConfig::new(500))?;

        wdt.advance_ms(600);
        assert!(wdt.has_expired());
        assert_eq!(wdt.metrics().expiry_count, 1);
        Ok(())
    }

    #[test]
    fn test_stop_on_stopped_peripheral_is_ok() -> TestResult {
        let mut wdt = SimulatedWatchdog::default();
        wdt.stop()?;
        assert_eq!(wdt.metrics().stop_count, 0);
        Ok(())
    }

    #[test]
    fn test_reinit_after_expiry() -> TestResult {
        let mut wdt = SimulatedWatchdog::default();
        wdt.init(&HalConfig::new(10))?;
        wdt.advance_ms(10);
        assert!(wdt.has_expired());

        wdt.init(&HalConfig::new(10))?;
        assert!(wdt.is_running());
        assert_eq!(wdt.metrics().init_count, 2);
        Ok(())
    }
}

mod kicking {
    use super::*;

    #[test]
    fn test_periodic_kicks_prevent_expiry() -> TestResult {
        let mut wdt = SimulatedWatchdog::default();
        wdt.init(&HalConfig::new(100))?;

        for _ in 0..50 {
            wdt.advance_ms(60);
            wdt.kick();
        }
        assert!(!wdt.has_expired());
        assert_eq!(wdt.metrics().kick_count, 50);
        Ok(())
    }

    #[test]
    fn test_kick_when_stopped_is_ignored() -> TestResult {
        let mut wdt = SimulatedWatchdog::default();
        wdt.kick();
        assert_eq!(wdt.metrics().kick_count, 0);
        assert!(!wdt.is_running());
        Ok(())
    }

    #[test]
    fn test_kick_after_expiry_does_not_revive() -> TestResult {
        let mut wdt = SimulatedWatchdog::default();
        wdt.init(&HalConfig::new(10))?;
        wdt.advance_ms(20);
        wdt.kick();
        assert!(wdt.has_expired());
        Ok(())
    }
}

mod platform {
    use super::*;

    #[test]
    fn test_features_are_reported() -> TestResult {
        let features = PlatformFeatures::builder()
            .max_timeout(2500)
            .update_timeout_supported(false)
            .build()?;
        let wdt = SimulatedWatchdog::try_new(features)?;
        assert_eq!(wdt.platform_features(), features);
        Ok(())
    }

    #[test]
    fn test_try_new_rejects_zero_ceiling() -> TestResult {
        let features = PlatformFeatures {
            max_timeout: 0,
            ..PlatformFeatures::default()
        };
        assert!(SimulatedWatchdog::try_new(features).is_err());
        Ok(())
    }

    #[test]
    fn test_reload_value_reflects_rounding() -> TestResult {
        let mut wdt = SimulatedWatchdog::with_resolution(PlatformFeatures::new(4096), 250);
        wdt.init(&HalConfig::new(600))?;
        assert_eq!(wdt.reload_value(), 750);
        Ok(())
    }
}
