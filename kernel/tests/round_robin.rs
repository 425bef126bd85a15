//! Time slicing: the same workload under round-robin and cooperative FIFO.

mod common;

use common::{Board, Journal, STACK_SIZE, WORKER_PRIORITY, started_kernel};
use kernel::sched::{CoopFifo, RoundRobin, SchedPolicy};
use kernel::{Kernel, Pid};

/// Three equal-priority workers, each logging its name then taking a timer
/// interrupt, twice.
fn run_workers(kernel: &'static Kernel, board: &'static Board) -> Vec<String> {
    let journal = Journal::leaked();
    let mut pids: Vec<Pid> = Vec::new();
    for name in ["w1", "w2", "w3"] {
        let pid = kernel
            .spawn_kernel_process(name, WORKER_PRIORITY, STACK_SIZE, move |k| {
                for _ in 0..2 {
                    journal.push(name);
                    board.tick(k);
                }
                0
            })
            .unwrap();
        pids.push(pid);
    }

    kernel.schedule_if_needed();

    for pid in pids {
        assert_eq!(kernel.wait_pid(pid), Ok(0));
    }
    journal.entries()
}

#[test]
fn round_robin_rotates_equal_priority_workers_on_every_tick() {
    let board: &'static Board = Box::leak(Box::new(Board::new()));
    let kernel = started_kernel(Box::new(RoundRobin::new(board.ticker())), 8);
    assert_eq!(kernel.policy_name(), "preempt-rr");
    board.attach(kernel);

    let order = run_workers(kernel, board);
    assert_eq!(order, ["w1", "w2", "w3", "w1", "w2", "w3"]);
}

#[test]
fn fifo_ignores_ticks_and_runs_each_worker_to_completion() {
    let board: &'static Board = Box::leak(Box::new(Board::new()));
    let kernel = started_kernel(Box::new(CoopFifo), 8);
    assert_eq!(kernel.policy_name(), "coop-fifo");
    board.attach(kernel);

    let order = run_workers(kernel, board);
    assert_eq!(order, ["w1", "w1", "w2", "w2", "w3", "w3"]);
}

#[test]
fn more_urgent_process_is_not_sliced_away() {
    let board: &'static Board = Box::leak(Box::new(Board::new()));
    let policy: Box<dyn SchedPolicy> = Box::new(RoundRobin::new(board.ticker()));
    let kernel = started_kernel(policy, 8);
    board.attach(kernel);
    let journal = Journal::leaked();

    let low = kernel
        .spawn_kernel_process("low", WORKER_PRIORITY + 1, STACK_SIZE, move |_| {
            journal.push("low");
            0
        })
        .unwrap();
    let high = kernel
        .spawn_kernel_process("high", WORKER_PRIORITY, STACK_SIZE, move |k| {
            for _ in 0..3 {
                journal.push("high");
                board.tick(k);
            }
            0
        })
        .unwrap();

    kernel.schedule_if_needed();
    assert_eq!(kernel.wait_pid(high), Ok(0));
    assert_eq!(kernel.wait_pid(low), Ok(0));
    assert_eq!(journal.entries(), ["high", "high", "high", "low"]);
    assert!(kernel.ctx_switches() >= 3);
}
