//! # Notification Templates
//!
//! Renders the three notification kinds into transport-agnostic
//! [`EmailContent`]. Rendering is behind a trait so deployments can swap in
//! their own wording without touching the pipelines; [`DefaultTemplates`]
//! is plain English with the worked arithmetic spelled out.

use referral_core::{EmailContent, Money};

// =============================================================================
// Template Parameters
// =============================================================================

/// Inputs for a staged discount notification.
#[derive(Debug, Clone)]
pub struct StandardEmail<'a> {
    pub referrer_name: Option<&'a str>,
    pub rate_percent: i64,
    pub referral_level: i64,
    pub previous_price: Money,
    pub new_price: Money,
    pub discount_amount: Money,
}

/// Inputs for a bonus step notification (4th referral onwards).
#[derive(Debug, Clone)]
pub struct BonusEmail<'a> {
    pub referrer_name: Option<&'a str>,
    pub referral_count: i64,
    pub previous_price: Money,
    pub new_price: Money,
    pub discount_amount: Money,
}

/// Inputs for a correction after a reset.
#[derive(Debug, Clone)]
pub struct CorrectionEmail<'a> {
    pub referrer_name: Option<&'a str>,
    pub rate_percent: i64,
    pub reversed_amount: Money,
}

// =============================================================================
// Templates Trait
// =============================================================================

/// Notification content rendering.
pub trait EmailTemplates: Send + Sync {
    fn standard(&self, params: &StandardEmail<'_>) -> EmailContent;
    fn bonus(&self, params: &BonusEmail<'_>) -> EmailContent;
    fn correction(&self, params: &CorrectionEmail<'_>) -> EmailContent;
}

// =============================================================================
// Default Templates
// =============================================================================

/// The built-in wording.
#[derive(Debug, Clone, Default)]
pub struct DefaultTemplates;

fn salutation(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("Hi {name},"),
        None => "Hi,".to_string(),
    }
}

fn ordinal(n: i64) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

impl EmailTemplates for DefaultTemplates {
    fn standard(&self, params: &StandardEmail<'_>) -> EmailContent {
        let subject = format!(
            "Your referral discount: {}% off your subscription",
            params.rate_percent
        );
        let body = format!(
            "{salutation}\n\n\
             Your {level} referral just came through, and your discount has \
             moved up to {rate}%.\n\n\
             Previous price:  {previous}\n\
             Discount:       -{amount} ({rate}% of {previous})\n\
             New price:       {new}\n\n\
             The new price applies from your next billing cycle.\n\n\
             Thanks for spreading the word!",
            salutation = salutation(params.referrer_name),
            level = ordinal(params.referral_level),
            rate = params.rate_percent,
            previous = params.previous_price,
            amount = params.discount_amount,
            new = params.new_price,
        );
        EmailContent { subject, body }
    }

    fn bonus(&self, params: &BonusEmail<'_>) -> EmailContent {
        let subject = "Bonus referral discount: another 3% off".to_string();
        let body = format!(
            "{salutation}\n\n\
             You are past your third referral ({count} so far), so this one \
             earns you a bonus: a further 3% off your already discounted \
             price.\n\n\
             Current price:   {previous}\n\
             Bonus discount: -{amount} (3% of {previous})\n\
             New price:       {new}\n\n\
             Every additional referral keeps stacking another 3% the same \
             way.\n\n\
             Thanks for spreading the word!",
            salutation = salutation(params.referrer_name),
            count = params.referral_count,
            previous = params.previous_price,
            amount = params.discount_amount,
            new = params.new_price,
        );
        EmailContent { subject, body }
    }

    fn correction(&self, params: &CorrectionEmail<'_>) -> EmailContent {
        let subject = "Correction to your referral discount".to_string();
        let body = format!(
            "{salutation}\n\n\
             The {rate}% referral discount we notified you about earlier was \
             sent in error and has been withdrawn. The price change of \
             {amount} does not apply.\n\n\
             Your discount status is back to where it was before that \
             notification. We apologise for the confusion.",
            salutation = salutation(params.referrer_name),
            rate = params.rate_percent,
            amount = params.reversed_amount,
        );
        EmailContent { subject, body }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(21), "21st");
    }

    #[test]
    fn test_standard_email_carries_worked_arithmetic() {
        let content = DefaultTemplates.standard(&StandardEmail {
            referrer_name: Some("Anna"),
            rate_percent: 6,
            referral_level: 2,
            previous_price: Money::from_cents(9700),
            new_price: Money::from_cents(9118),
            discount_amount: Money::from_cents(582),
        });

        assert!(content.subject.contains("6%"));
        assert!(content.body.contains("Hi Anna,"));
        assert!(content.body.contains("2nd referral"));
        assert!(content.body.contains("97.00"));
        assert!(content.body.contains("91.18"));
        assert!(content.body.contains("5.82"));
    }

    #[test]
    fn test_bonus_email_references_current_price() {
        let content = DefaultTemplates.bonus(&BonusEmail {
            referrer_name: None,
            referral_count: 4,
            previous_price: Money::from_cents(8297),
            new_price: Money::from_cents(8048),
            discount_amount: Money::from_cents(249),
        });

        assert!(content.body.starts_with("Hi,"));
        assert!(content.body.contains("82.97"));
        assert!(content.body.contains("80.48"));
        assert!(content.body.contains("2.49"));
    }

    #[test]
    fn test_correction_email_names_reversed_amount() {
        let content = DefaultTemplates.correction(&CorrectionEmail {
            referrer_name: Some("Anna"),
            rate_percent: 6,
            reversed_amount: Money::from_cents(582),
        });

        assert!(content.subject.contains("Correction"));
        assert!(content.body.contains("6%"));
        assert!(content.body.contains("5.82"));
    }
}
