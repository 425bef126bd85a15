mod common;

use common::{Journal, STACK_SIZE, WORKER_PRIORITY, started_kernel};
use kernel::ProcessStatus;
use kernel::sched::CoopFifo;
use kernel::sync::Semaphore;

#[test]
fn release_hands_the_unit_to_the_blocked_process() {
    let kernel = started_kernel(Box::new(CoopFifo), 8);
    let sem: &'static Semaphore = Box::leak(Box::new(Semaphore::new(0)));
    let journal = Journal::leaked();

    let p = kernel
        .spawn_kernel_process("P", WORKER_PRIORITY, STACK_SIZE, move |k| {
            journal.push("P waits");
            sem.acquire(k);
            journal.push(format!("P acquired count={}", sem.count()));
            0
        })
        .unwrap();
    let q = kernel
        .spawn_kernel_process("Q", WORKER_PRIORITY, STACK_SIZE, move |k| {
            journal.push("Q releases");
            sem.release(k);
            k.yield_now();
            journal.push("Q after");
            0
        })
        .unwrap();

    kernel.schedule_if_needed();

    assert_eq!(kernel.wait_pid(p), Ok(0));
    assert_eq!(kernel.wait_pid(q), Ok(0));
    assert_eq!(
        journal.entries(),
        ["P waits", "Q releases", "P acquired count=0", "Q after"]
    );
    assert_eq!(sem.count(), 0);
    assert_eq!(sem.waiters(), 0);
}

#[test]
fn each_release_lets_exactly_one_waiter_through() {
    let kernel = started_kernel(Box::new(CoopFifo), 8);
    let sem: &'static Semaphore = Box::leak(Box::new(Semaphore::new(0)));
    let journal = Journal::leaked();

    let mut waiters = Vec::new();
    for name in ["a", "b", "c"] {
        let pid = kernel
            .spawn_kernel_process(name, WORKER_PRIORITY, STACK_SIZE, move |k| {
                sem.acquire(k);
                journal.push(name);
                0
            })
            .unwrap();
        waiters.push(pid);
    }

    // Everybody blocks
    kernel.schedule_if_needed();
    for &pid in &waiters {
        assert_eq!(kernel.process_info(pid).unwrap().status, ProcessStatus::Blocked);
    }

    sem.release(kernel);
    assert_eq!(journal.entries(), ["a"]);
    sem.release(kernel);
    assert_eq!(journal.entries(), ["a", "b"]);
    assert_eq!(kernel.process_info(waiters[2]).unwrap().status, ProcessStatus::Blocked);
    sem.release(kernel);
    assert_eq!(journal.entries(), ["a", "b", "c"]);

    for pid in waiters {
        assert_eq!(kernel.wait_pid(pid), Ok(0));
    }
    assert_eq!(sem.count(), 0);
}

#[test]
fn available_units_do_not_block() {
    let kernel = started_kernel(Box::new(CoopFifo), 8);
    let sem = Semaphore::new(3);
    for _ in 0..3 {
        sem.acquire(kernel);
    }
    assert_eq!(sem.count(), 0);
    assert!(!sem.try_acquire());
    sem.release(kernel);
    assert_eq!(sem.count(), 1);
}
