use rand::Rng;

use crate::selector::ALPHABET;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_0: u32 = 11;
pub const KEY_MINUS: u32 = 12;
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_ENTER: u32 = 28;
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;
pub const KEY_RIGHTCTRL: u32 = 97;

pub const KEY_A: u32 = 30;
pub const KEY_C: u32 = 46;
pub const KEY_Q: u32 = 16;

/// Keycodes for `a..=z`, in alphabetical order.
const LETTER_KEYCODES: [u32; 26] = [
    30, 48, 46, 32, 18, 33, 34, 35, 23, 36, 37, 38, 50, 49, 24, 25, 16, 19, 31, 20, 22, 47, 17,
    45, 21, 44,
];

/// Shifted characters on the number row, `!` through `)`.
const SHIFTED_DIGITS: [char; 10] = ['!', '@', '#', '$', '%', '^', '&', '*', '(', ')'];

fn digit_keycode(d: u32) -> u32 {
    // `0` sits after `9` on the number row.
    if d == 0 {
        KEY_0
    } else {
        KEY_1 + d - 1
    }
}

/// US-QWERTY keystroke for `c`, or `None` when the layout has no key for it
/// (accented letters, for instance).
pub fn keystroke_for_char(c: char) -> Option<KeyStroke> {
    let plain = |keycode| Some(KeyStroke {
        keycode,
        shift: false,
    });
    let shifted = |keycode| Some(KeyStroke {
        keycode,
        shift: true,
    });

    if c.is_ascii_lowercase() {
        return plain(LETTER_KEYCODES[(c as u8 - b'a') as usize]);
    }
    if c.is_ascii_uppercase() {
        return shifted(LETTER_KEYCODES[(c as u8 - b'A') as usize]);
    }
    if let Some(d) = c.to_digit(10) {
        return plain(digit_keycode(d));
    }
    if let Some(pos) = SHIFTED_DIGITS.iter().position(|&s| s == c) {
        return shifted(digit_keycode((pos as u32 + 1) % 10));
    }

    match c {
        ' ' => plain(KEY_SPACE),
        '.' => plain(KEY_DOT),
        ',' => plain(KEY_COMMA),
        '-' => plain(KEY_MINUS),
        '\'' => plain(KEY_APOSTROPHE),
        '/' => plain(KEY_SLASH),
        '?' => shifted(KEY_SLASH),
        '\n' => plain(KEY_ENTER),
        _ => None,
    }
}

pub fn qwerty_adjacent_char(c: char, rng: &mut impl Rng) -> Option<char> {
    let (base, make_upper) = if c.is_ascii_uppercase() {
        (c.to_ascii_lowercase(), true)
    } else {
        (c, false)
    };

    let neighbors: &[char] = match base {
        'a' => &['q', 'w', 's', 'z'],
        'b' => &['v', 'g', 'h', 'n'],
        'c' => &['x', 'd', 'f', 'v'],
        'd' => &['s', 'e', 'r', 'f', 'c', 'x'],
        'e' => &['w', 's', 'd', 'r'],
        'f' => &['d', 'r', 't', 'g', 'v', 'c'],
        'g' => &['f', 't', 'y', 'h', 'b', 'v'],
        'h' => &['g', 'y', 'u', 'j', 'n', 'b'],
        'i' => &['u', 'j', 'k', 'o'],
        'j' => &['h', 'u', 'i', 'k', 'm', 'n'],
        'k' => &['j', 'i', 'o', 'l', 'm'],
        'l' => &['k', 'o', 'p'],
        'm' => &['n', 'j', 'k'],
        'n' => &['b', 'h', 'j', 'm'],
        'o' => &['i', 'k', 'l', 'p'],
        'p' => &['o', 'l'],
        'q' => &['w', 'a'],
        'r' => &['e', 'd', 'f', 't'],
        's' => &['a', 'w', 'e', 'd', 'x', 'z'],
        't' => &['r', 'f', 'g', 'y'],
        'u' => &['y', 'h', 'j', 'i'],
        'v' => &['c', 'f', 'g', 'b'],
        'w' => &['q', 'a', 's', 'e'],
        'x' => &['z', 's', 'd', 'c'],
        'y' => &['t', 'g', 'h', 'u'],
        'z' => &['a', 's', 'x'],
        _ => return None,
    };

    let chosen = neighbors[rng.gen_range(0..neighbors.len())];
    Some(if make_upper {
        chosen.to_ascii_uppercase()
    } else {
        chosen
    })
}

/// A plausible slip of the finger while aiming for `c`: a neighbouring key when there is
/// one, otherwise any letter.
pub fn typo_for(c: char, rng: &mut impl Rng) -> char {
    qwerty_adjacent_char(c, rng).unwrap_or_else(|| {
        let letters = ALPHABET.as_bytes();
        letters[rng.gen_range(0..letters.len())] as char
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn letters_and_digits_map_to_evdev_codes() {
        assert_eq!(keystroke_for_char('a').map(|k| k.keycode), Some(KEY_A));
        assert_eq!(keystroke_for_char('q').map(|k| k.keycode), Some(KEY_Q));
        assert_eq!(keystroke_for_char('1').map(|k| k.keycode), Some(KEY_1));
        assert_eq!(keystroke_for_char('0').map(|k| k.keycode), Some(KEY_0));
        assert_eq!(
            keystroke_for_char('!'),
            Some(KeyStroke {
                keycode: KEY_1,
                shift: true
            })
        );
        assert_eq!(keystroke_for_char('ç'), None);
    }

    #[test]
    fn typo_never_returns_the_same_ascii_letter() {
        let mut rng = StdRng::seed_from_u64(1);
        for c in ALPHABET.chars() {
            for _ in 0..10 {
                assert_ne!(typo_for(c, &mut rng), c);
            }
        }
        // Accented letters have no neighbours; any letter will do.
        assert!(typo_for('ã', &mut rng).is_ascii_lowercase());
    }
}
