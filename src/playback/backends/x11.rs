use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ConnectionExt as _, CreateWindowAux, ImageFormat, WindowClass,
};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest, Event};
use x11rb::rust_connection::RustConnection;

use crate::config::AppConfig;
use crate::interfaces::{FragmentCapture, TextInjector, ThreadSleeper, TurnDetector};
use crate::keyboard::{keystroke_for_char, KEY_A, KEY_BACKSPACE, KEY_C, KEY_ENTER, KEY_LEFTCTRL, KEY_LEFTSHIFT};
use crate::playback::backends::COMMON_MODIFIER_KEYCODES;
use crate::playback::grey_similarity;
use crate::positions::{Point, Positions, Rect};
use crate::session::Collaborators;

const LEFT_BUTTON: u8 = 1;
const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(60);
const REMAP_SETTLE: Duration = Duration::from_millis(10);
const SELECTION_TIMEOUT: Duration = Duration::from_millis(500);
const SELECTION_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    Pressed,
    Released,
}

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn key_state_to_x11_event_type(state: KeyState) -> u8 {
    match state {
        KeyState::Pressed => xproto::KEY_PRESS_EVENT,
        KeyState::Released => xproto::KEY_RELEASE_EVENT,
    }
}

/// Keysym for a Unicode character: Latin-1 maps directly, the rest uses the
/// 0x0100_0000 Unicode range.
fn keysym_for_char(c: char) -> xproto::Keysym {
    let code = c as u32;
    if code <= 0xff {
        code
    } else {
        0x0100_0000 | code
    }
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }
    Ok(())
}

fn validate_us_letters(conn: &impl Connection) -> Result<()> {
    for (evdev, expected) in [(KEY_A, 'a'), (crate::keyboard::KEY_Q, 'q')] {
        let keycode = evdev_to_x11_keycode(evdev)?;
        let reply = conn
            .get_keyboard_mapping(keycode, 1)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to read keyboard mapping")?;
        let got = reply.keysyms.first().copied().unwrap_or(x11rb::NO_SYMBOL);
        if got != keysym_for_char(expected) {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout (keycode {keycode}: got {got:#x}). Try `setxkbmap us`."
            ));
        }
    }
    Ok(())
}

fn to_i16(value: i32, what: &str) -> Result<i16> {
    i16::try_from(value).map_err(|_| anyhow!("{what} {value} is outside the X11 coordinate range"))
}

/// One X connection shared by the injector, the capture and the turn detector.
struct Display {
    conn: RustConnection,
    root: xproto::Window,
    scratch_keycode: u8,
    keysyms_per_keycode: u8,
    scratch_original: Vec<xproto::Keysym>,
}

impl Display {
    fn open() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_letters(&conn)?;

        let setup = conn.setup();
        let root = setup
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?
            .root;
        let (min, max) = (setup.min_keycode, setup.max_keycode);

        let mapping = conn
            .get_keyboard_mapping(min, max - min + 1)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to read keyboard mapping")?;
        let per = mapping.keysyms_per_keycode;
        if per == 0 {
            return Err(anyhow!("X server returned 0 keysyms per keycode"));
        }

        // Prefer a keycode with nothing bound to it; otherwise borrow the last one.
        let rows: Vec<&[xproto::Keysym]> = mapping.keysyms.chunks(per as usize).collect();
        let free = rows
            .iter()
            .rposition(|row| row.iter().all(|&k| k == x11rb::NO_SYMBOL));
        let row_index = free.unwrap_or(rows.len().saturating_sub(1));
        let scratch_keycode = min.saturating_add(u8::try_from(row_index).unwrap_or(u8::MAX - min));
        let scratch_original = rows
            .get(row_index)
            .map(|row| row.to_vec())
            .unwrap_or_else(|| vec![x11rb::NO_SYMBOL; per as usize]);

        let display = Self {
            conn,
            root,
            scratch_keycode,
            keysyms_per_keycode: per,
            scratch_original,
        };
        display.reset_modifiers_best_effort();
        Ok(display)
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush().context("failed to flush X11 connection")
    }

    /// Round trip so the server has processed everything sent so far.
    fn sync(&self) -> Result<()> {
        self.conn
            .get_input_focus()
            .context("failed to request input focus")?
            .reply()
            .context("failed to read input focus reply")?;
        Ok(())
    }

    fn fake(&self, type_: u8, detail: u8, x: i16, y: i16) -> Result<()> {
        self.conn
            .xtest_fake_input(type_, detail, x11rb::CURRENT_TIME, self.root, x, y, 0)
            .context("failed to send XTEST fake input")?;
        Ok(())
    }

    fn key(&self, keycode: u8, state: KeyState) -> Result<()> {
        self.fake(key_state_to_x11_event_type(state), keycode, 0, 0)
    }

    fn tap(&self, keycode: u8) -> Result<()> {
        self.key(keycode, KeyState::Pressed)?;
        self.key(keycode, KeyState::Released)?;
        self.flush()
    }

    fn tap_evdev(&self, evdev: u32, shift: bool) -> Result<()> {
        let keycode = evdev_to_x11_keycode(evdev)?;
        let shift_code = evdev_to_x11_keycode(KEY_LEFTSHIFT)?;
        if shift {
            self.key(shift_code, KeyState::Pressed)?;
        }
        self.key(keycode, KeyState::Pressed)?;
        self.key(keycode, KeyState::Released)?;
        if shift {
            self.key(shift_code, KeyState::Released)?;
        }
        self.flush()
    }

    fn chord(&self, modifier: u32, evdev: u32) -> Result<()> {
        let modifier = evdev_to_x11_keycode(modifier)?;
        let keycode = evdev_to_x11_keycode(evdev)?;
        self.key(modifier, KeyState::Pressed)?;
        self.key(keycode, KeyState::Pressed)?;
        self.key(keycode, KeyState::Released)?;
        self.key(modifier, KeyState::Released)?;
        self.flush()
    }

    /// Type a character the US layout has no key for by binding it to the scratch keycode.
    fn type_keysym(&self, keysym: xproto::Keysym) -> Result<()> {
        let row = vec![keysym; self.keysyms_per_keycode as usize];
        self.conn
            .change_keyboard_mapping(1, self.scratch_keycode, self.keysyms_per_keycode, &row)
            .context("failed to remap scratch keycode")?;
        self.sync()?;
        std::thread::sleep(REMAP_SETTLE);
        self.tap(self.scratch_keycode)
    }

    fn move_pointer(&self, at: Point) -> Result<()> {
        let x = to_i16(at.x, "x")?;
        let y = to_i16(at.y, "y")?;
        self.fake(xproto::MOTION_NOTIFY_EVENT, 0, x, y)
    }

    fn click(&self) -> Result<()> {
        self.fake(xproto::BUTTON_PRESS_EVENT, LEFT_BUTTON, 0, 0)?;
        self.fake(xproto::BUTTON_RELEASE_EVENT, LEFT_BUTTON, 0, 0)?;
        self.flush()
    }

    /// Grey levels of `rect`, row-major.
    fn grab_grey(&self, rect: Rect) -> Result<Vec<u8>> {
        let width = u16::try_from(rect.width).context("turn bar width too large")?;
        let height = u16::try_from(rect.height).context("turn bar height too large")?;
        let reply = self
            .conn
            .get_image(
                ImageFormat::Z_PIXMAP,
                self.root,
                to_i16(rect.x, "x")?,
                to_i16(rect.y, "y")?,
                width,
                height,
                !0,
            )
            .context("failed to request screen grab")?
            .reply()
            .context("failed to read screen grab")?;

        let pixels = usize::from(width) * usize::from(height);
        if pixels == 0 {
            return Ok(Vec::new());
        }
        let bytes_per_pixel = reply.data.len() / pixels;
        if bytes_per_pixel < 3 {
            return Err(anyhow!(
                "unsupported screen depth {} ({} bytes per pixel)",
                reply.depth,
                bytes_per_pixel
            ));
        }

        // Z-pixmap on little-endian servers is BGRX.
        Ok(reply
            .data
            .chunks_exact(bytes_per_pixel)
            .take(pixels)
            .map(|px| {
                let (b, g, r) = (u32::from(px[0]), u32::from(px[1]), u32::from(px[2]));
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            })
            .collect())
    }

    fn reset_modifiers_best_effort(&self) {
        for keycode in COMMON_MODIFIER_KEYCODES {
            if let Ok(code) = evdev_to_x11_keycode(keycode) {
                let _ = self.key(code, KeyState::Released);
            }
        }
        let _ = self.conn.flush();
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        self.reset_modifiers_best_effort();
        let _ = self.conn.change_keyboard_mapping(
            1,
            self.scratch_keycode,
            self.keysyms_per_keycode,
            &self.scratch_original,
        );
        let _ = self.conn.flush();
    }
}

pub struct X11Injector {
    display: Arc<Display>,
}

impl TextInjector for X11Injector {
    fn focus(&mut self, at: Point) -> Result<()> {
        self.display.move_pointer(at)?;
        self.display.click()
    }

    fn type_char(&mut self, c: char) -> Result<()> {
        match keystroke_for_char(c) {
            Some(stroke) => self.display.tap_evdev(stroke.keycode, stroke.shift),
            None => self.display.type_keysym(keysym_for_char(c)),
        }
    }

    fn press_backspace(&mut self) -> Result<()> {
        self.display.tap_evdev(KEY_BACKSPACE, false)
    }

    fn press_enter(&mut self) -> Result<()> {
        self.display.tap_evdev(KEY_ENTER, false)
    }

    fn select_all(&mut self) -> Result<()> {
        self.display.chord(KEY_LEFTCTRL, KEY_A)
    }
}

/// Double-clicks the letters, copies them and reads the CLIPBOARD selection.
pub struct X11ClipboardCapture {
    display: Arc<Display>,
    window: xproto::Window,
    clipboard: xproto::Atom,
    utf8: xproto::Atom,
    property: xproto::Atom,
    letters: Point,
    post_copy: Duration,
}

fn intern(conn: &impl Connection, name: &[u8]) -> Result<xproto::Atom> {
    Ok(conn
        .intern_atom(false, name)
        .context("failed to intern atom")?
        .reply()
        .context("failed to read atom")?
        .atom)
}

impl X11ClipboardCapture {
    fn new(display: Arc<Display>, letters: Point, post_copy_delay_ms: u64) -> Result<Self> {
        let conn = &display.conn;
        let window = conn.generate_id().context("failed to allocate window id")?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            display.root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new(),
        )
        .context("failed to create selection window")?;

        let clipboard = intern(conn, b"CLIPBOARD")?;
        let utf8 = intern(conn, b"UTF8_STRING")?;
        let property = intern(conn, b"WORDBOMB_SELECTION")?;

        Ok(Self {
            display,
            window,
            clipboard,
            utf8,
            property,
            letters,
            post_copy: Duration::from_millis(post_copy_delay_ms),
        })
    }

    fn read_clipboard(&self) -> Result<String> {
        let conn = &self.display.conn;
        conn.convert_selection(
            self.window,
            self.clipboard,
            self.utf8,
            self.property,
            x11rb::CURRENT_TIME,
        )
        .context("failed to request clipboard conversion")?;
        self.display.flush()?;

        let deadline = Instant::now() + SELECTION_TIMEOUT;
        loop {
            while let Some(event) = conn.poll_for_event().context("X11 connection error")? {
                let Event::SelectionNotify(ev) = event else {
                    continue;
                };
                if ev.requestor != self.window {
                    continue;
                }
                if ev.property == x11rb::NONE {
                    return Ok(String::new());
                }
                let reply = conn
                    .get_property(true, self.window, self.property, AtomEnum::ANY, 0, u32::MAX / 4)
                    .context("failed to request clipboard contents")?
                    .reply()
                    .context("failed to read clipboard contents")?;
                return Ok(String::from_utf8_lossy(&reply.value).into_owned());
            }

            if Instant::now() >= deadline {
                tracing::debug!("clipboard owner did not answer in time");
                return Ok(String::new());
            }
            std::thread::sleep(SELECTION_POLL);
        }
    }
}

impl FragmentCapture for X11ClipboardCapture {
    fn capture_fragment(&mut self) -> Result<String> {
        self.display.move_pointer(self.letters)?;
        self.display.click()?;
        std::thread::sleep(DOUBLE_CLICK_GAP);
        self.display.click()?;
        std::thread::sleep(self.post_copy);
        self.display.chord(KEY_LEFTCTRL, KEY_C)?;
        std::thread::sleep(self.post_copy);
        self.read_clipboard()
    }
}

/// Compares the turn bar against the last accepted grab.
pub struct X11TurnDetector {
    display: Arc<Display>,
    rect: Rect,
    threshold: f64,
    reference: Option<Vec<u8>>,
    warned_missing_rect: bool,
}

impl X11TurnDetector {
    fn grab(&self) -> Option<Vec<u8>> {
        match self.display.grab_grey(self.rect) {
            Ok(grey) => Some(grey),
            Err(err) => {
                tracing::warn!("failed to capture turn bar: {err:#}");
                None
            }
        }
    }
}

impl TurnDetector for X11TurnDetector {
    fn is_my_turn(&mut self) -> Result<bool> {
        if self.rect.is_empty() {
            if !self.warned_missing_rect {
                tracing::warn!("turn bar rectangle not configured; submissions are cancelled");
                self.warned_missing_rect = true;
            }
            return Ok(false);
        }

        let Some(current) = self.grab() else {
            return Ok(false);
        };

        let Some(reference) = &self.reference else {
            self.reference = Some(current);
            return Ok(true);
        };

        let score = grey_similarity(reference, &current);
        if score >= self.threshold {
            self.reference = Some(current);
            return Ok(true);
        }

        tracing::warn!(
            "turn bar similarity {score:.3} below threshold {:.3}",
            self.threshold
        );
        Ok(false)
    }

    fn refresh_reference(&mut self) -> Result<()> {
        if self.rect.is_empty() {
            return Ok(());
        }
        if let Some(grey) = self.grab() {
            self.reference = Some(grey);
            self.warned_missing_rect = false;
        }
        Ok(())
    }
}

/// Open the X display and build all collaborators on top of one shared connection.
pub fn connect(cfg: &AppConfig, positions: &Positions) -> Result<Collaborators> {
    let display = Arc::new(Display::open()?);
    tracing::info!("connected to X11 (XTEST available)");

    let capture =
        X11ClipboardCapture::new(display.clone(), positions.letters, cfg.post_copy_delay_ms)?;

    Ok(Collaborators {
        turns: Box::new(X11TurnDetector {
            display: display.clone(),
            rect: positions.turn_bar,
            threshold: cfg.turn_bar_threshold,
            reference: None,
            warned_missing_rect: false,
        }),
        capture: Box::new(capture),
        injector: Box::new(X11Injector { display }),
        sleeper: Box::new(ThreadSleeper),
    })
}
