//! # VAT Engine
//!
//! Derives base / VAT amount / net from any two of the three, and checks
//! that a fully specified triple adds up.
//!
//! ## Terms
//! ```text
//! base  ── price before VAT
//! vat   ── net − base
//! net   ── price the customer pays, VAT included
//!
//! from_base:  net  = round(base · (100 + pct) / 100)
//! from_net:   base = round(net · 100 / (100 + pct))
//! ```
//!
//! Only the Spanish rates 0, 4, 10 and 21 % are accepted.
//!
//! ## Example
//! ```rust
//! use banquet_core::vat::{from_base, from_net};
//!
//! let b = from_base(1000, 21).unwrap();
//! assert_eq!((b.vat_cents, b.net_cents), (210, 1210));
//!
//! let n = from_net(1210, 21).unwrap();
//! assert_eq!(n.base_cents, 1000);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{div_round, from_minor, to_minor};

/// Allowed VAT percentages.
pub const ALLOWED_VAT_PCTS: [u32; 4] = [0, 4, 10, 21];

/// Tolerance, in cents, when checking a full triple.
pub const COHERENCE_TOLERANCE_CENTS: i64 = 1;

// =============================================================================
// Types
// =============================================================================

/// A VAT computation in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VatBreakdown {
    pub base_cents: i64,
    pub vat_pct: u32,
    pub vat_cents: i64,
    pub net_cents: i64,
}

impl VatBreakdown {
    /// Money-string form for callers.
    pub fn to_result(&self) -> VatResult {
        VatResult {
            base_price: from_minor(self.base_cents),
            vat_pct: self.vat_pct,
            vat_amount: from_minor(self.vat_cents),
            net_price: from_minor(self.net_cents),
        }
    }
}

/// VAT result as produced for consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VatResult {
    pub base_price: String,
    pub vat_pct: u32,
    pub vat_amount: String,
    pub net_price: String,
}

/// VAT input as received from an expense or invoice document.
///
/// Valid shapes: base only, net only, or all three amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VatInput {
    pub base_price: Option<String>,
    pub vat_pct: u32,
    pub vat_amount: Option<String>,
    pub net_price: Option<String>,
}

// =============================================================================
// Operations
// =============================================================================

/// Rejects percentages outside [`ALLOWED_VAT_PCTS`].
pub fn check_rate(vat_pct: u32) -> CoreResult<()> {
    if ALLOWED_VAT_PCTS.contains(&vat_pct) {
        Ok(())
    } else {
        Err(CoreError::InvalidVatRate { pct: vat_pct })
    }
}

/// Base price known: derive net and VAT.
pub fn from_base(base_cents: i64, vat_pct: u32) -> CoreResult<VatBreakdown> {
    check_rate(vat_pct)?;
    let net_cents = div_round(base_cents as i128 * (100 + vat_pct) as i128, 100);
    Ok(VatBreakdown {
        base_cents,
        vat_pct,
        vat_cents: net_cents - base_cents,
        net_cents,
    })
}

/// Net price known: derive base and VAT.
pub fn from_net(net_cents: i64, vat_pct: u32) -> CoreResult<VatBreakdown> {
    check_rate(vat_pct)?;
    let base_cents = div_round(net_cents as i128 * 100, (100 + vat_pct) as i128);
    Ok(VatBreakdown {
        base_cents,
        vat_pct,
        vat_cents: net_cents - base_cents,
        net_cents,
    })
}

/// Accepts a full triple when every field is within one cent of the
/// values recomputed from the base.
pub fn coherence(
    base_cents: i64,
    vat_pct: u32,
    vat_cents: i64,
    net_cents: i64,
) -> CoreResult<VatBreakdown> {
    let expected = from_base(base_cents, vat_pct)?;
    let close = |a: i64, b: i64| (a - b).abs() <= COHERENCE_TOLERANCE_CENTS;

    if close(expected.vat_cents, vat_cents) && close(expected.net_cents, net_cents) {
        Ok(VatBreakdown {
            base_cents,
            vat_pct,
            vat_cents,
            net_cents,
        })
    } else {
        Err(CoreError::IncoherentVatTriple {
            vat_pct,
            expected_base_price: from_minor(expected.base_cents),
            expected_vat_amount: from_minor(expected.vat_cents),
            expected_net_price: from_minor(expected.net_cents),
        })
    }
}

/// Dispatches on the shape of the input.
///
/// ```rust
/// use banquet_core::vat::{process, VatInput};
///
/// let input = VatInput {
///     net_price: Some("12.10".to_string()),
///     vat_pct: 21,
///     ..Default::default()
/// };
/// let result = process(&input).unwrap();
/// assert_eq!(result.base_price, "10.00");
/// assert_eq!(result.vat_amount, "2.10");
/// ```
pub fn process(input: &VatInput) -> CoreResult<VatResult> {
    let parse = |s: &Option<String>| s.as_deref().map(to_minor).transpose();
    let base = parse(&input.base_price)?;
    let vat = parse(&input.vat_amount)?;
    let net = parse(&input.net_price)?;

    let breakdown = match (base, vat, net) {
        (Some(base), None, None) => from_base(base, input.vat_pct)?,
        (None, None, Some(net)) => from_net(net, input.vat_pct)?,
        (Some(base), Some(vat), Some(net)) => coherence(base, input.vat_pct, vat, net)?,
        _ => {
            return Err(CoreError::InvalidVatInput {
                reason: "provide the base price, the net price, or all of base, VAT amount and net"
                    .to_string(),
            })
        }
    };

    Ok(breakdown.to_result())
}

// =============================================================================
// Unit Tests
// =============================================================================
