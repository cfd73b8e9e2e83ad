/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // seconds

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn from_millis(ms: u64) -> Self {
        Time(ms as f64 / 1000.0)
    }
}

impl std::ops::Add for Time {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Time(self.0 + other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn from_millis_converts_to_seconds() {
        assert_eq!(Time::from_millis(1500), Time(1.5));
        assert_eq!(Time::from_millis(0), Time::ZERO);
    }
}
