use std::{str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MyDuration(u64);

impl MyDuration {
    pub(crate) fn into_std_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl FromStr for MyDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let multiplier = match s.as_bytes().last().context("Duration cannot be empty")? {
            b's' => 1,
            b'm' => 60,
            b'h' => 60 * 60,
            _ => anyhow::bail!("Final character in duration must be s, m, or h."),
        };
        let s = &s[0..s.len() - 1];
        let num: u64 = s
            .parse()
            .with_context(|| format!("Could not parse duration value {s}"))?;
        num.checked_mul(multiplier)
            .map(MyDuration)
            .with_context(|| format!("Duration {s} is too large"))
    }
}
