//! End-to-end tests driving the scheduler through its public API. These
//! exercise real OS threads (C-EXEC/I-EXEC), so assertions rely on values
//! collected into shared, mutex-guarded state rather than on timing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskfs::config::UtlConfig;
use taskfs::utl::{task, Utl};

fn test_config() -> UtlConfig {
    UtlConfig {
        shutdown_drain_timeout_ms: 2_000,
        ..UtlConfig::default()
    }
}

#[test]
fn ready_queue_runs_tasks_in_fifo_order() {
    let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let scheduler = Utl::init(test_config());

    for i in 0..5u32 {
        let order = order.clone();
        assert!(scheduler.create(move || {
            task::yield_now();
            order.lock().unwrap().push(i);
        }));
    }

    scheduler.shutdown();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn blocking_io_does_not_stall_other_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("utl_io.bin");
    let finished: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let scheduler = Utl::init(test_config());

    let io_path = path.clone();
    let io_done = finished.clone();
    assert!(scheduler.create(move || {
        let fd = task::open(io_path);
        assert!(fd >= 0);
        let n = task::write(fd, b"payload");
        assert_eq!(n, 7);
        assert_eq!(task::close(fd), 0);
        io_done.lock().unwrap().push("io");
    }));

    let compute_done = finished.clone();
    assert!(scheduler.create(move || {
        for _ in 0..3 {
            task::yield_now();
        }
        compute_done.lock().unwrap().push("compute");
    }));

    scheduler.shutdown();

    let order = finished.lock().unwrap();
    assert_eq!(order.len(), 2);
    assert!(order.contains(&"io"));
    assert!(order.contains(&"compute"));

    let written = std::fs::read(&path).unwrap();
    assert_eq!(&written, b"payload");
}

#[test]
fn try_create_rejects_creation_past_the_configured_limit() {
    let scheduler = Utl::init(UtlConfig {
        max_tasks: 2,
        ..test_config()
    });

    assert!(scheduler.try_create(|| task::yield_now()).is_ok());
    assert!(scheduler.try_create(|| task::yield_now()).is_ok());
    assert!(scheduler.try_create(|| task::yield_now()).is_err());

    scheduler.shutdown();
}

#[test]
fn create_returns_false_and_leaks_nothing_once_the_table_is_full() {
    let scheduler = Utl::init(UtlConfig {
        max_tasks: 2,
        ..test_config()
    });

    assert!(scheduler.create(|| task::yield_now()));
    assert!(scheduler.create(|| task::yield_now()));
    assert!(!scheduler.create(|| task::yield_now()));
    assert_eq!(scheduler.live_tasks(), 2);

    scheduler.shutdown();
}

#[test]
fn exit_ends_a_task_before_its_remaining_body_runs() {
    let ran_past_exit = Arc::new(Mutex::new(false));
    let scheduler = Utl::init(test_config());

    let flag = ran_past_exit.clone();
    scheduler.create(move || {
        task::exit();
        #[allow(unreachable_code)]
        {
            *flag.lock().unwrap() = true;
        }
    });

    std::thread::sleep(Duration::from_millis(50));
    scheduler.shutdown();
    assert!(!*ran_past_exit.lock().unwrap());
}
