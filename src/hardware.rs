use sysinfo::System;

/// Physical core count, used by the parallel cluster executor's budget
/// calculation (spec §4.4, §9 invariant 10).
pub fn physical_cores() -> usize {
    num_cpus::get_physical().max(1)
}

/// Available RAM in GiB at the moment of the call, used by Stage 1's
/// adaptive edge threshold (spec §4.2) and Stage 2's low-RAM sequential
/// fallback (spec §4.4).
pub fn available_ram_gb() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory() as f64 / (1024.0 * 1024.0 * 1024.0)
}
