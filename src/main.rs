//! Arcade cabinet binary: `invaders8080 <image-path>`.

use std::path::PathBuf;
use std::process::ExitCode;

use invaders8080::cpu::Cpu8080;
use invaders8080::error::EmuError;
use invaders8080::invaders::InvadersMachine;
use invaders8080::presenter::window::WindowPresenter;
use invaders8080::presenter::{Event, Key, Presenter};
use invaders8080::scheduler::FrameScheduler;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("invaders8080: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), EmuError> {
    let path = std::env::args_os().nth(1).ok_or_else(|| EmuError::Load {
        path: PathBuf::new(),
        reason: "usage: invaders8080 <image-path>".to_string(),
    })?;
    let path = PathBuf::from(path);

    let mut machine = InvadersMachine::load_rom_file(&path)?;
    let mut cpu = Cpu8080::new();

    let presenter = WindowPresenter::new()?;
    let mut scheduler = FrameScheduler::new(presenter.now_ms());

    presenter.run(move |p| {
        for event in p.poll_events() {
            match event {
                Event::Quit => return,
                Event::KeyDown(key) => apply_key(&mut machine, key, true),
                Event::KeyUp(key) => apply_key(&mut machine, key, false),
            }
        }
        scheduler.tick(&mut cpu, &mut machine, p.now_ms());
        p.blit_argb(machine.video_buffer());
    })
}

fn apply_key(machine: &mut InvadersMachine, key: Key, down: bool) {
    match key {
        Key::Coin => machine.set_coin(down),
        Key::P1Start => machine.set_p1_start(down),
        Key::P2Start => machine.set_p2_start(down),
        Key::Fire => machine.set_fire(down),
        Key::Left => machine.set_left(down),
        Key::Right => machine.set_right(down),
        Key::ToggleColor => {
            if down {
                machine.color_flag = !machine.color_flag;
            }
        }
        Key::TogglePause => {
            if down {
                machine.pause_flag = !machine.pause_flag;
            }
        }
        Key::Quit => {}
    }
}
