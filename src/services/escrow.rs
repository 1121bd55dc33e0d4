use serde::Serialize;

/// Consultation fee in kobo (NGN 3,000).
pub const CONSULTATION_FEE: i64 = 300_000;
const CONSULTATION_PLATFORM_FEE: i64 = 50_000;

/// Division of a gross payment between the platform and the professional.
/// Recorded as balances only; no money moves when a split is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowSplit {
    pub gross: i64,
    pub platform_fee: i64,
    pub professional_share: i64,
}

impl EscrowSplit {
    pub fn consultation() -> Self {
        Self::with_fee(CONSULTATION_FEE, CONSULTATION_PLATFORM_FEE)
    }

    pub fn with_fee(gross: i64, platform_fee: i64) -> Self {
        let platform_fee = platform_fee.clamp(0, gross.max(0));
        Self {
            gross,
            platform_fee,
            professional_share: gross - platform_fee,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.gross == self.platform_fee + self.professional_share
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consultation_split_matches_published_amounts() {
        let split = EscrowSplit::consultation();
        assert_eq!(split.gross, 300_000);
        assert_eq!(split.platform_fee, 50_000);
        assert_eq!(split.professional_share, 250_000);
        assert!(split.is_balanced());
    }

    #[test]
    fn fee_never_exceeds_gross() {
        let split = EscrowSplit::with_fee(10_000, 25_000);
        assert_eq!(split.platform_fee, 10_000);
        assert_eq!(split.professional_share, 0);
        assert!(split.is_balanced());
    }
}
