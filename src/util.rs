// Display formatting for the dashboard and headless output

pub fn format_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2} s", ms / 1000.0)
    } else {
        format!("{:.1} ms", ms)
    }
}

pub fn format_tokens_per_sec(tokens: f64) -> String {
    const K: f64 = 1000.0;
    if tokens >= K {
        format!("{:.2}k tok/s", tokens / K)
    } else {
        format!("{:.0} tok/s", tokens)
    }
}

pub fn format_rps(requests: f64) -> String {
    format!("{:.1} req/s", requests)
}

/// Upper y bound for a chart: the series max with headroom, never below `floor`.
pub fn chart_ceiling(values: impl Iterator<Item = f64>, floor: f64) -> f64 {
    let max = values.fold(floor, f64::max);
    (max + max / 10.0).ceil()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_units() {
        assert_eq!(format_ms(65.04), "65.0 ms");
        assert_eq!(format_ms(1500.0), "1.50 s");
        assert_eq!(format_tokens_per_sec(125.4), "125 tok/s");
        assert_eq!(format_tokens_per_sec(1024.0), "1.02k tok/s");
        assert_eq!(format_rps(12.34), "12.3 req/s");
    }

    #[test]
    fn ceiling_respects_floor() {
        assert_eq!(chart_ceiling(std::iter::empty(), 10.0), 11.0);
        assert_eq!(chart_ceiling([100.0, 200.0].into_iter(), 10.0), 220.0);
    }
}
