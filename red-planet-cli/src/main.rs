use std::fs;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use red_planet_core::cpu::{Cpu, StepOutcome};
use red_planet_core::csr;
use red_planet_core::registers::Specifier;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Flat binary program image, loaded at the base of DRAM.
    program: String,

    /// Increase log verbosity. Repeat for more detail (`-v` = info, `-vv` = debug, `-vvv` = trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress the register/CSR/PC dump that normally follows a halt or fatal fault.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> io::Result<ExitCode> {
    let image = fs::read(&args.program)?;
    info!("loaded {} bytes from {}", image.len(), args.program);

    let mut cpu = Cpu::new(&image);

    let outcome = loop {
        match cpu.step() {
            StepOutcome::Continue => continue,
            outcome => break outcome,
        }
    };

    let exit_code = match outcome {
        StepOutcome::Halted => {
            info!("halted at pc={:#010x}", cpu.pc());
            ExitCode::SUCCESS
        }
        StepOutcome::FatalFault(exception) => {
            error!("fatal fault at pc={:#010x}: {exception}", cpu.pc());
            ExitCode::FAILURE
        }
        StepOutcome::Continue => unreachable!("loop only breaks on Halted or FatalFault"),
    };

    if !args.quiet {
        dump_regs(&cpu);
        dump_pc(&cpu);
        dump_csrs(&cpu);
    }

    Ok(exit_code)
}

/// Prints every `x` register, ABI-named, one per line.
fn dump_regs(cpu: &Cpu) {
    const ABI_NAMES: [&str; 32] = [
        "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
        "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
        "t5", "t6",
    ];
    for specifier in Specifier::iter_all() {
        let index = u8::from(specifier);
        println!(
            "x{:<2} ({:<4}) = {:#010x}",
            index,
            ABI_NAMES[index as usize],
            cpu.x(specifier)
        );
    }
}

fn dump_pc(cpu: &Cpu) {
    println!("pc       = {:#010x}", cpu.pc());
}

/// Prints the trap-relevant CSRs (privilege level, delegation, and the M/S trap state).
fn dump_csrs(cpu: &Cpu) {
    println!("priv     = {}", cpu.privilege());
    println!("mstatus  = {:#010x}", cpu.csr(csr::MSTATUS));
    println!("mepc     = {:#010x}", cpu.csr(csr::MEPC));
    println!("mcause   = {:#010x}", cpu.csr(csr::MCAUSE));
    println!("mtval    = {:#010x}", cpu.csr(csr::MTVAL));
    println!("sepc     = {:#010x}", cpu.csr(csr::SEPC));
    println!("scause   = {:#010x}", cpu.csr(csr::SCAUSE));
    println!("stval    = {:#010x}", cpu.csr(csr::STVAL));
}
