use std::time::Duration;

/// Sleep up to `ms`, waking early once `is_running` reports false.
pub fn sleep_while_running(is_running: impl Fn() -> bool, ms: u64) {
    let mut remaining = ms;
    while remaining > 0 {
        if !is_running() {
            return;
        }
        let step = remaining.min(50);
        std::thread::sleep(Duration::from_millis(step));
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::sleep_while_running;

    #[test]
    fn returns_immediately_when_stopped() {
        let started = Instant::now();
        sleep_while_running(|| false, 5_000);
        assert!(started.elapsed().as_millis() < 1_000);
    }
}
