use preview_check::{
    config,
    notice::{Notice, Notices, Notifier},
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Sink {
    seen: Mutex<Vec<(&'static str, Notice)>>,
}

impl Notifier for Sink {
    fn warning(&self, notice: &Notice) {
        self.seen.lock().unwrap().push(("warning", notice.clone()));
    }
    fn success(&self, notice: &Notice) {
        self.seen.lock().unwrap().push(("success", notice.clone()));
    }
    fn info(&self, notice: &Notice) {
        self.seen.lock().unwrap().push(("info", notice.clone()));
    }
}

#[test]
fn routes_channels_with_default_durations() {
    let sink = Arc::new(Sink::default());
    let notices = Notices::new(Some(sink.clone() as Arc<dyn Notifier>));

    notices.warning("disk", "almost full");
    notices.success("saved", "");
    notices.notice("heads up", "");
    notices.warning_for("quota", "", Duration::from_secs(30));
    notices.info_for("brief", "", Duration::from_millis(1500));

    let seen = sink.seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert_eq!(seen[0].0, "warning");
    assert_eq!(seen[0].1.desc, "almost full");
    assert_eq!(seen[0].1.duration, Duration::from_secs(10));
    assert_eq!(seen[1].0, "success");
    assert_eq!(seen[1].1.duration, Duration::from_millis(4500));
    // notice has no channel of its own
    assert_eq!(seen[2].0, "info");
    assert_eq!(seen[2].1.title, "heads up");
    assert_eq!(seen[3].0, "warning");
    assert_eq!(seen[3].1.duration, Duration::from_secs(30));
    assert_eq!(seen[4].0, "info");
    assert_eq!(seen[4].1.duration, Duration::from_millis(1500));
}

#[test]
fn config_durations_apply() {
    let cfg = config::Notice {
        sink: "alert".into(),
        warning_seconds: 2.0,
        default_seconds: 1.0,
    };
    // no sink: falls back to the stderr alert and must not panic
    let notices = Notices::from_config(&cfg).unwrap();
    notices.warning("fallback", "alert path");
    notices.info("fallback", "");
}

#[test]
fn bad_notice_config_is_an_error() {
    let mut cfg = config::Notice::default();
    cfg.warning_seconds = f32::INFINITY;
    assert!(Notices::from_config(&cfg).is_err());

    let mut cfg = config::Notice::default();
    cfg.sink = "logs".into();
    assert!(Notices::from_config(&cfg).is_err());
}
