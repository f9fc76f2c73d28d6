//! Trap entry, dispatch and trap exit driven the way a scheduler drives them.

use trapctx::arch::{Mstatus, Riscv32};
use trapctx::config;
use trapctx::{ContextManager, ContextRef, RegisterContext, RegisterLayout, SwitchConfig};

fn task_a() -> RegisterContext<Riscv32> {
    let mut ctx = RegisterContext::<Riscv32>::zeroed();
    for (i, reg) in ctx.regs_mut().iter_mut().enumerate() {
        *reg = i as u32 + 1;
    }
    ctx.set_status(0x0000_0080);
    ctx
}

/// Stands in for the trap-entry stub: the interrupted registers land in the
/// trap frame, with the hardware having moved MIE into MPIE.
fn hardware_trap(manager: &mut ContextManager<Riscv32>, cpu: usize, pc: u32) {
    let frame = manager.trap_frame_handle(cpu).unwrap();
    let regs = manager.trap_frame_mut(frame).regs_mut();
    regs[Riscv32::REG_MEPC] = pc;
    regs[Riscv32::REG_MSTATUS] = (Mstatus::MPP | Mstatus::MPIE).bits();
    manager.enter_trap(frame);
}

#[test]
fn boot_into_first_task() {
    let config = SwitchConfig::from_build()
        .with_num_cpus(1)
        .with_suppress_interrupts(false);
    let installed = config::init_global(config).unwrap();
    let mut manager = ContextManager::<Riscv32>::from_global().unwrap();
    assert_eq!(manager.config(), installed);

    let a = manager.insert_task(task_a()).unwrap();
    let frame = manager.trap_frame_handle(0).unwrap();

    manager.flush_task_into_trap(a, frame);
    let trap = *manager.trap_frame(frame);
    assert!(trap.trap_enabled());
    assert_eq!(trap.status() & Riscv32::TRAP_ENABLE.mask, 0x80);
    assert_eq!(trap, task_a());

    manager.latch_current_as_task(frame, a);
    assert_eq!(manager.current(frame), ContextRef::Task(a));
    assert!(std::ptr::eq(
        manager.current_context(frame),
        manager.task(a).unwrap()
    ));
    assert!(!std::ptr::eq(
        manager.current_context(frame),
        manager.trap_frame(frame)
    ));
}

#[test]
fn round_robin_with_capture() {
    let config = SwitchConfig::from_build()
        .with_num_cpus(1)
        .with_max_tasks(4)
        .with_suppress_interrupts(false);
    let mut manager = ContextManager::<Riscv32>::new(config).unwrap();
    let frame = manager.trap_frame_handle(0).unwrap();

    let mut tasks = Vec::new();
    for entry in [0x8000_1000u32, 0x8000_2000, 0x8000_3000] {
        let mut ctx = RegisterContext::<Riscv32>::zeroed();
        ctx.regs_mut()[Riscv32::REG_MEPC] = entry;
        ctx.set_status(Mstatus::MPP.bits());
        tasks.push(manager.insert_task(ctx).unwrap());
    }

    // Boot: the first task is resumed through the same path as any switch.
    let reloaded = *manager.dispatch(frame, tasks[0]);
    assert_eq!(reloaded.mepc(), 0x8000_1000);
    assert!(reloaded.trap_enabled());

    let mut running = 0;
    for tick in 1..=6u32 {
        let pc = 0x8000_1000 + running as u32 * 0x1000 + tick * 4;
        hardware_trap(&mut manager, 0, pc);
        manager.save_trap_into_task(frame, tasks[running]);
        assert_eq!(manager.task(tasks[running]).unwrap().mepc(), pc);

        running = (running + 1) % tasks.len();
        let reloaded = *manager.dispatch(frame, tasks[running]);
        let saved = manager.task(tasks[running]).unwrap();
        assert_eq!(reloaded, saved.with_trap_enable(true));
        assert_eq!(manager.current(frame), ContextRef::Task(tasks[running]));
    }

    let stats = manager.stats(0).unwrap();
    assert_eq!(stats.traps, 6);
    assert_eq!(stats.dispatches, 7);
    assert_eq!(stats.flushes, 7);
    assert_eq!(stats.latches, 7);
    assert_eq!(manager.copy_stats().copies, 13);
}

#[test]
fn suppression_policy_keeps_traps_off() {
    let config = SwitchConfig::from_build()
        .with_num_cpus(2)
        .with_suppress_interrupts(true);
    let mut manager = ContextManager::<Riscv32>::new(config).unwrap();
    let a = manager.insert_task(task_a()).unwrap();
    let b = manager.insert_task(task_a()).unwrap();

    let cpu0 = manager.trap_frame_handle(0).unwrap();
    let cpu1 = manager.trap_frame_handle(1).unwrap();
    manager.dispatch(cpu0, a);
    manager.dispatch(cpu1, b);

    for frame in [cpu0, cpu1] {
        let trap = manager.trap_frame(frame);
        assert!(!trap.trap_enabled());
        assert_eq!(trap.status(), 0);
        let n = Riscv32::STATUS_SLOT;
        assert_eq!(&trap.regs()[..n], &task_a().regs()[..n]);
    }
    assert!(manager.task(a).unwrap().trap_enabled());
    assert_eq!(manager.current(cpu0), ContextRef::Task(a));
    assert_eq!(manager.current(cpu1), ContextRef::Task(b));

    // A task that ran on one core is retired once neither core has it live.
    let c = manager.insert_task(task_a()).unwrap();
    hardware_trap(&mut manager, 0, 0x8000_0100);
    manager.save_trap_into_task(cpu0, a);
    manager.dispatch(cpu0, c);
    assert!(manager.remove_task(a).is_some());
    assert!(manager.task(a).is_none());
}
