//! VAT split-out for gross amounts.
//!
//! Amounts recorded by the shop are gross. The net is derived by dividing by
//! `1 + rate` and the tax is whatever remains, so `net + vat == amount`
//! always holds exactly.

use crate::errors::ServiceError;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Placeholder written into supplier fields when there is no valid receipt
pub const NOT_APPLICABLE: &str = "N/A";

/// How tax applies to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VatTreatment {
    Standard,
    NonVat,
    NoValidReceipt,
}

impl VatTreatment {
    /// A missing receipt takes precedence over the non-VAT flag.
    pub fn from_flags(is_non_vat: bool, no_valid_receipt: bool) -> Self {
        if no_valid_receipt {
            VatTreatment::NoValidReceipt
        } else if is_non_vat {
            VatTreatment::NonVat
        } else {
            VatTreatment::Standard
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VatBreakdown {
    pub net_of_vat: Decimal,
    pub vat: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct VatPolicy {
    rate: Decimal,
}

impl VatPolicy {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    /// Builds the policy from the configured floating-point rate
    pub fn from_rate(rate: f64) -> Result<Self, ServiceError> {
        Decimal::from_f64(rate)
            .map(|r| Self::new(r.round_dp(6)))
            .ok_or_else(|| ServiceError::InternalError(format!("invalid VAT rate {}", rate)))
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn split(
        &self,
        amount: Decimal,
        treatment: VatTreatment,
    ) -> Result<VatBreakdown, ServiceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ServiceError::ValidationError(
                "amount must not be negative".to_string(),
            ));
        }

        let breakdown = match treatment {
            VatTreatment::NonVat | VatTreatment::NoValidReceipt => VatBreakdown {
                net_of_vat: amount,
                vat: Decimal::ZERO,
            },
            VatTreatment::Standard => {
                let net = (amount / (Decimal::ONE + self.rate))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                VatBreakdown {
                    net_of_vat: net,
                    vat: amount - net,
                }
            }
        };

        Ok(breakdown)
    }
}

/// Supplier identification carried by expenses and procurements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupplierFields {
    pub supplier_name: String,
    pub reference: String,
    pub tin: String,
    pub address: String,
}

impl SupplierFields {
    /// Without a valid receipt the supplier fields are meaningless and get
    /// replaced with `N/A`; otherwise each one is required.
    pub fn normalize(self, no_valid_receipt: bool) -> Result<Self, ServiceError> {
        if no_valid_receipt {
            return Ok(Self {
                supplier_name: NOT_APPLICABLE.to_string(),
                reference: NOT_APPLICABLE.to_string(),
                tin: NOT_APPLICABLE.to_string(),
                address: NOT_APPLICABLE.to_string(),
            });
        }

        let missing: Vec<&str> = [
            ("supplierName", &self.supplier_name),
            ("reference", &self.reference),
            ("tin", &self.tin),
            ("address", &self.address),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(Self {
                supplier_name: self.supplier_name.trim().to_string(),
                reference: self.reference.trim().to_string(),
                tin: self.tin.trim().to_string(),
                address: self.address.trim().to_string(),
            })
        } else {
            Err(ServiceError::ValidationError(format!(
                "{} required unless noValidReceipt is set",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn policy() -> VatPolicy {
        VatPolicy::new(dec!(0.12))
    }

    #[test_case(dec!(1120), dec!(1000), dec!(120) ; "round amount")]
    #[test_case(dec!(100), dec!(89.29), dec!(10.71) ; "rounded net")]
    #[test_case(dec!(0), dec!(0), dec!(0) ; "zero")]
    fn standard_split(amount: Decimal, net: Decimal, vat: Decimal) {
        let b = policy().split(amount, VatTreatment::Standard).unwrap();
        assert_eq!(b.net_of_vat, net);
        assert_eq!(b.vat, vat);
    }

    #[test]
    fn non_vat_and_missing_receipt_zero_the_tax() {
        for treatment in [VatTreatment::NonVat, VatTreatment::NoValidReceipt] {
            let b = policy().split(dec!(500), treatment).unwrap();
            assert_eq!(b.net_of_vat, dec!(500));
            assert_eq!(b.vat, Decimal::ZERO);
        }
    }

    #[test]
    fn negative_amount_rejected() {
        assert_matches!(
            policy().split(dec!(-1), VatTreatment::Standard),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn receipt_flag_wins_over_non_vat() {
        assert_eq!(
            VatTreatment::from_flags(true, true),
            VatTreatment::NoValidReceipt
        );
        assert_eq!(VatTreatment::from_flags(true, false), VatTreatment::NonVat);
        assert_eq!(VatTreatment::from_flags(false, false), VatTreatment::Standard);
    }

    #[test]
    fn missing_receipt_overwrites_supplier_fields() {
        let fields = SupplierFields {
            supplier_name: "Parts Depot".into(),
            ..Default::default()
        }
        .normalize(true)
        .unwrap();
        assert_eq!(fields.supplier_name, NOT_APPLICABLE);
        assert_eq!(fields.tin, NOT_APPLICABLE);
    }

    #[test]
    fn supplier_fields_required_with_receipt() {
        let err = SupplierFields {
            supplier_name: "Parts Depot".into(),
            reference: "OR-1".into(),
            tin: " ".into(),
            address: String::new(),
        }
        .normalize(false)
        .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("tin") && msg.contains("address"));
    }

    #[test]
    fn rate_from_config_float() {
        assert_eq!(VatPolicy::from_rate(0.12).unwrap().rate(), dec!(0.12));
    }
}
