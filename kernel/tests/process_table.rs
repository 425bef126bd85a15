mod common;

use common::{Journal, STACK_SIZE, WORKER_PRIORITY, started_kernel};
use kernel::process::KILLED_EXIT_STATUS;
use kernel::sched::CoopFifo;
use kernel::{Pid, ProcessError, ProcessStatus};

/// Less urgent than init, so these never run unless init blocks.
const BACKGROUND_PRIORITY: u8 = 200;

#[test]
fn full_table_rejects_spawn_until_a_slot_is_reaped() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    // init and idle hold slots 0 and 1
    assert_eq!(kernel.current_pid(), Some(Pid(0)));
    assert!(kernel.process_info(Pid(1)).is_some());

    let a = kernel
        .spawn_kernel_process("a", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0)
        .unwrap();
    let b = kernel
        .spawn_kernel_process("b", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0)
        .unwrap();
    assert_eq!((a, b), (Pid(2), Pid(3)));

    let full = kernel.spawn_kernel_process("c", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0);
    assert_eq!(full, Err(ProcessError::TableFull));

    kernel.kill(a).unwrap();
    assert_eq!(kernel.wait_pid(a), Ok(KILLED_EXIT_STATUS));

    let c = kernel
        .spawn_kernel_process("c", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0)
        .unwrap();
    assert_eq!(c, Pid(2));
    assert_eq!(kernel.process_info(c).unwrap().name, "c");
}

#[test]
fn reused_slot_runs_the_new_process() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    let journal = Journal::leaked();

    let first = kernel
        .spawn_kernel_process("first", WORKER_PRIORITY, STACK_SIZE, move |_| {
            journal.push("first");
            1
        })
        .unwrap();
    kernel.schedule_if_needed();
    assert_eq!(kernel.wait_pid(first), Ok(1));

    let second = kernel
        .spawn_kernel_process("second", WORKER_PRIORITY, STACK_SIZE, move |_| {
            journal.push("second");
            2
        })
        .unwrap();
    assert_eq!(second, first);
    kernel.schedule_if_needed();
    assert_eq!(kernel.wait_pid(second), Ok(2));
    assert_eq!(journal.entries(), ["first", "second"]);
}

#[test]
fn parent_waits_for_a_running_child() {
    let kernel = started_kernel(Box::new(CoopFifo), 8);
    let journal = Journal::leaked();

    // Less urgent than init: it only runs once init blocks in wait_pid
    let child = kernel
        .spawn_kernel_process("child", BACKGROUND_PRIORITY, STACK_SIZE, move |k| {
            journal.push("child runs");
            k.yield_now();
            journal.push("child exits");
            42
        })
        .unwrap();

    assert_eq!(kernel.wait_pid(child), Ok(42));
    assert_eq!(journal.entries(), ["child runs", "child exits"]);
    assert!(kernel.process_info(child).is_none());
}

#[test]
fn orphans_are_handed_to_init() {
    let kernel = started_kernel(Box::new(CoopFifo), 8);
    let init = kernel.current_pid().unwrap();
    let grandchild: &'static std::sync::Mutex<Option<Pid>> =
        Box::leak(Box::new(std::sync::Mutex::new(None)));

    let parent = kernel
        .spawn_kernel_process("parent", WORKER_PRIORITY, STACK_SIZE, move |k| {
            let pid = k
                .spawn_kernel_process("orphan", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0)
                .unwrap();
            *grandchild.lock().unwrap() = Some(pid);
            0
        })
        .unwrap();
    kernel.schedule_if_needed();
    assert_eq!(kernel.wait_pid(parent), Ok(0));

    let orphan = grandchild.lock().unwrap().unwrap();
    assert_eq!(kernel.process_info(orphan).unwrap().parent, Some(init));
    assert_eq!(kernel.process_info(orphan).unwrap().status, ProcessStatus::Ready);
    kernel.kill(orphan).unwrap();
    assert_eq!(kernel.reap_zombie_children(init), 1);
    assert!(kernel.process_info(orphan).is_none());
}

#[test]
fn killing_a_waiting_parent_gives_the_child_slot_back() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    let init = kernel.current_pid().unwrap();
    let waited: &'static std::sync::Mutex<Option<Pid>> =
        Box::leak(Box::new(std::sync::Mutex::new(None)));

    let parent = kernel
        .spawn_kernel_process("parent", WORKER_PRIORITY, STACK_SIZE, move |k| {
            let child = k
                .spawn_kernel_process("child", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0)
                .unwrap();
            *waited.lock().unwrap() = Some(child);
            k.wait_pid(child).unwrap_or(-2)
        })
        .unwrap();
    kernel.schedule_if_needed();
    assert_eq!(kernel.process_info(parent).unwrap().status, ProcessStatus::Blocked);
    let child = waited.lock().unwrap().unwrap();
    assert_eq!(kernel.process_info(child).unwrap().refs, 1);

    kernel.kill(parent).unwrap();
    assert_eq!(kernel.process_info(child).unwrap().refs, 0);
    assert_eq!(kernel.wait_pid(parent), Ok(KILLED_EXIT_STATUS));

    kernel.kill(child).unwrap();
    assert_eq!(kernel.reap_zombie_children(init), 1);
    assert!(kernel.process_info(child).is_none());

    // Both slots are free again
    let a = kernel
        .spawn_kernel_process("a", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0)
        .unwrap();
    let b = kernel
        .spawn_kernel_process("b", BACKGROUND_PRIORITY, STACK_SIZE, |_| 0)
        .unwrap();
    assert_eq!((a, b), (Pid(2), Pid(3)));
}

#[test]
fn invalid_targets_are_rejected() {
    let kernel = started_kernel(Box::new(CoopFifo), 4);
    assert_eq!(kernel.kill(Pid(3)), Err(ProcessError::NoSuchProcess));
    assert_eq!(kernel.kill(Pid(0)), Err(ProcessError::InvalidState));
    assert_eq!(kernel.kill(Pid(1)), Err(ProcessError::InvalidState));
    assert_eq!(kernel.wait_pid(Pid(0)), Err(ProcessError::NotAChild));
    assert_eq!(kernel.set_priority(Pid(3), 5), Err(ProcessError::NoSuchProcess));
}
