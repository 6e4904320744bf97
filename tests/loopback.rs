//! End-to-end Controller + Switch exchange over real loopback UDP sockets.
//! Covers bootstrap only — the timeout-driven scenarios are exercised at
//! the unit level in `engine.rs` since they'd otherwise cost whole seconds
//! of wall clock.

use std::fs;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use routectl::controller::Controller;
use routectl::logging::EventLog;
use routectl::switch::Switch;

#[test]
fn two_switches_bootstrap_and_receive_routing_tables() {
    let dir = std::env::temp_dir().join(format!("routectl-loopback-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp test dir");
    let config_path = dir.join("topology.txt");
    fs::write(&config_path, "2\n0 1 1\n").expect("write test config");

    let controller_log_path = dir.join("Controller.log");
    let switch0_log_path = dir.join("switch0.log");
    let switch1_log_path = dir.join("switch1.log");

    let controller_log = Arc::new(EventLog::open(&controller_log_path).expect("open controller log"));
    let port = 19231u16;

    let bootstrap_config_path = config_path.clone();
    let _controller_thread = thread::spawn(move || {
        let controller =
            Controller::bootstrap(port, &bootstrap_config_path, controller_log).expect("controller bootstrap");
        controller.run()
    });

    // Give the controller a moment to bind before the switches dial in.
    thread::sleep(Duration::from_millis(200));

    let switch0_log = Arc::new(EventLog::open(&switch0_log_path).expect("open switch0 log"));
    let switch1_log = Arc::new(EventLog::open(&switch1_log_path).expect("open switch1 log"));

    let s0 = thread::spawn(move || Switch::register(0, "127.0.0.1", port, None, switch0_log).expect("switch 0 register"));
    let s1 = thread::spawn(move || Switch::register(1, "127.0.0.1", port, None, switch1_log).expect("switch 1 register"));

    let switch0 = s0.join().expect("switch 0 registration thread");
    let switch1 = s1.join().expect("switch 1 registration thread");

    thread::spawn(move || switch0.run());
    thread::spawn(move || switch1.run());

    // Let the bootstrap-time routing push land and get logged.
    thread::sleep(Duration::from_millis(300));

    let mut controller_log_text = String::new();
    fs::File::open(&controller_log_path)
        .expect("open controller log for reading")
        .read_to_string(&mut controller_log_text)
        .expect("read controller log");
    assert!(controller_log_text.contains("Register Request 0"));
    assert!(controller_log_text.contains("Register Request 1"));
    assert!(controller_log_text.contains("Register Response 0"));
    assert!(controller_log_text.contains("Register Response 1"));
    assert!(controller_log_text.contains("Routing Update"));
    assert!(controller_log_text.contains("0,1:1,1"));

    let mut switch0_log_text = String::new();
    fs::File::open(&switch0_log_path)
        .expect("open switch0 log for reading")
        .read_to_string(&mut switch0_log_text)
        .expect("read switch0 log");
    assert!(switch0_log_text.contains("Register Request Sent"));
    assert!(switch0_log_text.contains("Register Response Received"));
    assert!(switch0_log_text.contains("Routing Update"));

    let _ = fs::remove_dir_all(&dir);
}
