//! Real windowed presenter: `winit` drives the event loop, `pixels` blits
//! the ARGB frame to a GPU surface. These are the exact crates already
//! named by the teacher's `display` Cargo feature; nothing new is pulled
//! in.

use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use super::{Event, Key, Presenter};
use crate::error::EmuError;
use crate::invaders::video::{SCREEN_HEIGHT, SCREEN_WIDTH};

fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Digit3 => Some(Key::Coin),
        KeyCode::Digit2 => Some(Key::P2Start),
        KeyCode::Digit1 => Some(Key::P1Start),
        KeyCode::Space => Some(Key::Fire),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::Escape => Some(Key::Quit),
        KeyCode::KeyE => Some(Key::ToggleColor),
        KeyCode::KeyQ => Some(Key::TogglePause),
        _ => None,
    }
}

/// Window + GPU surface, created lazily once `winit` resumes the app
/// (required by the `ApplicationHandler` contract — there is no window
/// before the event loop actually starts).
struct Surface {
    window: Rc<Window>,
    pixels: Pixels<'static>,
}

/// Drives one `winit` event loop and forwards everything the scheduler
/// cares about through the [`Presenter`] trait. Owns its window and GPU
/// surface and tears them down in reverse-acquisition order on drop —
/// the teacher's RAII convention for device-owned resources (`Bus`,
/// `Ppu`), applied here instead of the source's explicit
/// `spaceinvaders_destroy` free-in-order dance.
pub struct WindowPresenter {
    surface: Option<Surface>,
    events: VecDeque<Event>,
    start: Instant,
    title: &'static str,
}

impl WindowPresenter {
    pub fn new() -> Result<Self, EmuError> {
        Ok(WindowPresenter {
            surface: None,
            events: VecDeque::new(),
            start: Instant::now(),
            title: "Space Invaders",
        })
    }

    /// Runs the `winit` event loop, calling `frame` once per redraw with
    /// `&mut self` so the caller can tick the scheduler and blit the next
    /// frame. Returns once the user quits.
    pub fn run(mut self, mut frame: impl FnMut(&mut WindowPresenter)) -> Result<(), EmuError> {
        let event_loop = EventLoop::new().map_err(|e| EmuError::PresenterInit(e.to_string()))?;
        let mut app = App {
            presenter: &mut self,
            frame: &mut frame,
        };
        event_loop
            .run_app(&mut app)
            .map_err(|e| EmuError::PresenterInit(e.to_string()))?;
        Ok(())
    }
}

impl Presenter for WindowPresenter {
    fn blit_argb(&mut self, buf: &[u32]) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let frame = surface.pixels.frame_mut();
        for (px, &argb) in frame.chunks_exact_mut(4).zip(buf.iter()) {
            let [a, r, g, b] = argb.to_be_bytes();
            px.copy_from_slice(&[r, g, b, a]);
        }
        let _ = surface.pixels.render();
    }

    fn poll_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

struct App<'a> {
    presenter: &'a mut WindowPresenter,
    frame: &'a mut dyn FnMut(&mut WindowPresenter),
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presenter.surface.is_some() {
            return;
        }
        let size = winit::dpi::LogicalSize::new(
            (SCREEN_WIDTH * 3) as f64,
            (SCREEN_HEIGHT * 3) as f64,
        );
        let attrs = Window::default_attributes()
            .with_title(self.presenter.title)
            .with_inner_size(size);
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Rc::new(w),
            Err(_) => {
                event_loop.exit();
                return;
            }
        };
        let inner = window.inner_size();
        let surface_texture = SurfaceTexture::new(inner.width, inner.height, window.clone());
        let pixels = match Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface_texture) {
            Ok(p) => p,
            Err(_) => {
                event_loop.exit();
                return;
            }
        };
        self.presenter.surface = Some(Surface { window, pixels });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.presenter.events.push_back(Event::Quit);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(surface) = self.presenter.surface.as_mut() {
                    let _ = surface.pixels.resize_surface(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        // Escape exits immediately, same as the cabinet's
                        // SDL_SCANCODE_ESCAPE handler setting exit_flag.
                        if key == Key::Quit && event.state == ElementState::Pressed {
                            self.presenter.events.push_back(Event::Quit);
                            event_loop.exit();
                            return;
                        }
                        self.presenter.events.push_back(match event.state {
                            ElementState::Pressed => Event::KeyDown(key),
                            ElementState::Released => Event::KeyUp(key),
                        });
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                (self.frame)(self.presenter);
                if let Some(surface) = self.presenter.surface.as_ref() {
                    surface.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(surface) = self.presenter.surface.as_ref() {
            surface.window.request_redraw();
        }
    }
}
