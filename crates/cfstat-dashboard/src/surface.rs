use crate::ui::{self, Scene};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io::{self, Stdout};

/// Where scenes end up. Released exactly once, whichever way the dashboard
/// exits.
pub trait Surface {
    fn draw(&mut self, scene: &Scene<'_>) -> io::Result<()>;
    fn release(&mut self) -> io::Result<()>;
}

pub struct TerminalSurface<B: Backend> {
    terminal: Terminal<B>,
    raw_mode: bool,
    released: bool,
}

impl TerminalSurface<CrosstermBackend<Stdout>> {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Self::start(CrosstermBackend::new(stdout), true)
    }
}

impl<B: Backend> TerminalSurface<B> {
    /// A surface that never touches the real terminal.
    pub fn headless(backend: B) -> io::Result<Self> {
        Self::start(backend, false)
    }

    /// Any failure here leaves the screen restored: before the surface
    /// exists it is undone inline, afterwards by `Drop`.
    fn start(backend: B, raw_mode: bool) -> io::Result<Self> {
        let terminal = match Terminal::new(backend) {
            Ok(terminal) => terminal,
            Err(err) => {
                if raw_mode {
                    let _ = leave_screen();
                }
                return Err(err);
            }
        };
        let mut surface = Self {
            terminal,
            raw_mode,
            released: false,
        };
        surface.terminal.hide_cursor()?;
        surface.terminal.clear()?;
        Ok(surface)
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<B: Backend> Surface for TerminalSurface<B> {
    fn draw(&mut self, scene: &Scene<'_>) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.terminal.draw(|frame| ui::render(frame, scene))?;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        if self.raw_mode {
            leave_screen()?;
        }
        self.terminal.show_cursor()
    }
}

fn leave_screen() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)
}

impl<B: Backend> Drop for TerminalSurface<B> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
