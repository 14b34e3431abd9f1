//! CP/M exerciser runner: `cpm_harness <image-path>`.
//!
//! Grounded on `original_source/i8080-emulator.c`'s `main`: load, run to
//! halt, print collected console output followed by instruction/cycle
//! counts.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use invaders8080::cpm;
use invaders8080::error::EmuError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cpm_harness: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), EmuError> {
    let mut args = std::env::args_os().skip(1);
    let path = args.next().ok_or_else(|| EmuError::Load {
        path: PathBuf::new(),
        reason: "usage: cpm_harness <image-path>".to_string(),
    })?;
    let path = PathBuf::from(path);

    let bytes = std::fs::read(&path).map_err(|e| EmuError::Load {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let (mut machine, mut cpu) = cpm::load_cpm_image(&bytes)?;
    let (opcount, cycles) = cpm::run_to_halt(&mut machine, &mut cpu);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = out.write_all(machine.console_output());
    println!();
    println!("Instruction count: {opcount}");
    println!("Cycle count:       {cycles}");
    Ok(())
}
