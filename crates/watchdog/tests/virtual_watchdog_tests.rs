//! Virtual watchdog clients multiplexed over the hardware watchdog.

use std::sync::Arc;

use mbed_watchdog::prelude::*;
use mbed_watchdog_hal::{SimulatedWatchdog, Ticker, WatchdogHal};

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Harness {
    wdt: SimulatedWatchdog,
    ticker: ManualTicker,
    reset: Arc<RecordingReset>,
    registry: Arc<VirtualWatchdogRegistry<SimulatedWatchdog>>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("mbed_watchdog=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

impl Harness {
    fn new() -> Result<Self, WatchdogError> {
        Self::with_config(&WatchdogConfig::default())
    }

    fn with_config(config: &WatchdogConfig) -> Result<Self, WatchdogError> {
        init_tracing();
        let wdt = SimulatedWatchdog::default();
        let manager = Arc::new(HardwareWatchdogManager::new(wdt.clone()));
        let ticker = ManualTicker::new();
        let reset = Arc::new(RecordingReset::new());
        let registry =
            VirtualWatchdogRegistry::new(manager, ticker.clone(), reset.clone(), config)?;
        Ok(Self {
            wdt,
            ticker,
            reset,
            registry,
        })
    }

    /// Advance hardware and ticker together in 100 ms steps.
    fn run_ms(&self, ms: u32) {
        for _ in 0..ms / 100 {
            self.wdt.advance_ms(100);
            self.ticker.advance_ms(100);
        }
    }

    fn client(&self, timeout_ms: u32, name: &str) -> VirtualWatchdog<SimulatedWatchdog> {
        VirtualWatchdog::new(&self.registry, timeout_ms, name)
    }
}

mod bring_up {
    use super::*;

    #[test]
    fn test_hardware_idle_until_first_start() -> TestResult {
        let harness = Harness::new()?;
        let _client = harness.client(1000, "idle");

        assert!(!harness.registry.is_hardware_running());
        assert!(!harness.wdt.is_running());
        assert!(!harness.ticker.is_attached());
        Ok(())
    }

    #[test]
    fn test_first_start_arms_hardware_and_ticker() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(1000, "net");
        client.start()?;

        assert!(harness.registry.is_hardware_running());
        assert_eq!(harness.wdt.reload_value(), 800);
        assert_eq!(harness.registry.tick_period_ms(), 400);
        assert_eq!(harness.ticker.period_us(), Some(400_000));
        Ok(())
    }

    #[test]
    fn test_hardware_already_owned_fails_start() -> TestResult {
        let harness = Harness::new()?;
        harness.registry.manager().start(2000)?;

        let mut client = harness.client(1000, "late");
        assert!(matches!(
            client.start(),
            Err(WatchdogError::InitializationFailed(_))
        ));
        assert!(!client.is_running());
        assert_eq!(harness.registry.client_count(), 0);
        Ok(())
    }

    #[test]
    fn test_hardware_keeps_running_after_last_stop() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(1000, "net");
        client.start()?;
        client.stop();

        assert_eq!(harness.registry.client_count(), 0);
        assert!(harness.wdt.is_running());

        harness.run_ms(5000);
        assert!(!harness.wdt.has_expired());
        assert!(!harness.reset.triggered());
        Ok(())
    }
}

mod deadlines {
    use super::*;

    #[test]
    fn test_kicked_at_half_timeout_never_resets() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(1000, "net");
        client.start()?;

        for _ in 0..40 {
            harness.run_ms(500);
            client.kick();
        }
        assert!(!harness.reset.triggered());
        assert!(!harness.wdt.has_expired());
        Ok(())
    }

    #[test]
    fn test_unkicked_client_resets_once_count_exceeds_timeout() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(1000, "stuck");
        client.start()?;

        // Counts after each tick: 400, 800, 1200; the fourth tick sees 1200 > 1000.
        harness.run_ms(1200);
        assert!(!harness.reset.triggered());
        assert_eq!(client.elapsed_ms(), Some(1200));

        harness.run_ms(400);
        assert_eq!(harness.reset.count(), 1);
        let causes = harness.reset.causes();
        let cause = causes.first().ok_or("reset cause missing")?;
        assert_eq!(cause.client, "stuck");
        assert_eq!(cause.timeout_ms, 1000);
        assert_eq!(cause.elapsed_ms, 1200);
        Ok(())
    }

    #[test]
    fn test_count_equal_to_timeout_gets_one_more_tick() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(800, "edge");
        client.start()?;

        // Third tick sees 800, which is not greater than 800.
        harness.run_ms(1200);
        assert!(!harness.reset.triggered());

        harness.run_ms(400);
        assert!(harness.reset.triggered());
        Ok(())
    }

    #[test]
    fn test_count_just_over_timeout_resets_earlier() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(799, "tight");
        client.start()?;

        harness.run_ms(1200);
        assert!(harness.reset.triggered());
        Ok(())
    }

    #[test]
    fn test_expired_client_stops_hardware_kicks() -> TestResult {
        let harness = Harness::new()?;
        let mut healthy = harness.client(5000, "healthy");
        let mut stuck = harness.client(400, "stuck");
        healthy.start()?;
        stuck.start()?;

        for _ in 0..6 {
            harness.run_ms(400);
            healthy.kick();
        }
        assert!(harness.reset.triggered());
        assert!(harness.reset.causes().iter().all(|c| c.client == "stuck"));
        assert!(harness.wdt.has_expired());
        Ok(())
    }

    #[test]
    fn test_kick_resets_elapsed() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(1000, "net");
        client.start()?;

        harness.run_ms(800);
        assert_eq!(client.elapsed_ms(), Some(800));
        client.kick();
        assert_eq!(client.elapsed_ms(), Some(0));
        Ok(())
    }
}

mod membership {
    use super::*;

    #[test]
    fn test_process_visits_only_running_clients() -> TestResult {
        let harness = Harness::new()?;
        let mut a = harness.client(100, "a");
        let mut b = harness.client(10_000, "b");
        let mut c = harness.client(10_000, "c");
        a.start()?;
        b.start()?;
        c.start()?;
        a.stop();

        harness.run_ms(2000);
        assert!(!harness.reset.triggered());

        let mut names: Vec<String> = harness
            .registry
            .clients()
            .into_iter()
            .map(|snapshot| snapshot.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["b".to_string(), "c".to_string()]);
        Ok(())
    }

    #[test]
    fn test_drop_removes_client() -> TestResult {
        let harness = Harness::new()?;
        {
            let mut short = harness.client(100, "short");
            short.start()?;
            assert_eq!(harness.registry.client_count(), 1);
        }
        assert_eq!(harness.registry.client_count(), 0);

        harness.run_ms(2000);
        assert!(!harness.reset.triggered());
        Ok(())
    }

    #[test]
    fn test_restart_after_stop_starts_fresh() -> TestResult {
        let harness = Harness::new()?;
        let mut client = harness.client(1000, "net");
        client.start()?;
        harness.run_ms(800);
        client.stop();
        client.start()?;

        assert_eq!(client.elapsed_ms(), Some(0));
        assert_eq!(harness.registry.client_count(), 1);
        Ok(())
    }

    #[test]
    fn test_default_timeout_from_config() -> TestResult {
        let config = WatchdogConfig::builder()
            .default_virtual_timeout_ms(2500)
            .build()?;
        let harness = Harness::with_config(&config)?;
        let client = VirtualWatchdog::with_default_timeout(&harness.registry, &config, "cfg");
        assert_eq!(client.timeout_ms(), 2500);
        assert_eq!(client.name(), "cfg");
        assert!(!client.is_running());
        Ok(())
    }

    #[test]
    #[should_panic(expected = "started twice")]
    fn test_double_start_panics() {
        let Ok(harness) = Harness::new() else {
            return;
        };
        let mut client = harness.client(1000, "twice");
        let _ = client.start();
        let _ = client.start();
    }

    #[test]
    #[should_panic(expected = "kicked before start")]
    fn test_kick_before_start_panics() {
        let Ok(harness) = Harness::new() else {
            return;
        };
        harness.client(1000, "early").kick();
    }
}

mod thread_ticker {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_thread_ticker_drives_process() -> TestResult {
        let wdt = SimulatedWatchdog::default();
        let manager = Arc::new(HardwareWatchdogManager::new(wdt.clone()));
        let reset = Arc::new(RecordingReset::new());
        let config = WatchdogConfig::builder().hardware_timeout_ms(20).build()?;
        let registry =
            VirtualWatchdogRegistry::new(manager, ThreadTicker::new(), reset.clone(), &config)?;

        let mut client = VirtualWatchdog::new(&registry, 30, "thread");
        client.start()?;

        thread::sleep(Duration::from_millis(200));
        assert!(reset.triggered());
        assert!(registry.manager().stats().kicks > 0);
        Ok(())
    }
}
