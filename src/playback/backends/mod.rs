#[cfg(feature = "x11")]
pub mod x11;

// Modifiers released when a backend starts or shuts down, so a previous abort cannot
// leave one held.
#[cfg_attr(not(feature = "x11"), allow(dead_code))]
pub(crate) const COMMON_MODIFIER_KEYCODES: [u32; 5] = [
    crate::keyboard::KEY_LEFTSHIFT,
    crate::keyboard::KEY_RIGHTSHIFT,
    crate::keyboard::KEY_LEFTCTRL,
    crate::keyboard::KEY_RIGHTCTRL,
    crate::keyboard::KEY_LEFTALT,
];
