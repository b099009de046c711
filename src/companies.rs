//! Supported institutions and the credential fields each one logs in with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompanyType {
    Hapoalim,
    Beinleumi,
    Union,
    Amex,
    Isracard,
    VisaCal,
    Max,
    OtsarHahayal,
    Discount,
    Mercantile,
    Mizrahi,
    Leumi,
    Massad,
    Yahav,
    BeyahadBishvilha,
    OneZero,
    Behatsdaa,
    Pagi,
}

/// A credential field an institution's login form needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    /// A plain named field, looked up in [`Credentials`](crate::credentials::Credentials).
    Named(&'static str),
    /// An OTP source: either a code retriever or a long-term token satisfies it.
    Otp,
}

impl CompanyType {
    pub const ALL: [CompanyType; 18] = [
        CompanyType::Hapoalim,
        CompanyType::Beinleumi,
        CompanyType::Union,
        CompanyType::Amex,
        CompanyType::Isracard,
        CompanyType::VisaCal,
        CompanyType::Max,
        CompanyType::OtsarHahayal,
        CompanyType::Discount,
        CompanyType::Mercantile,
        CompanyType::Mizrahi,
        CompanyType::Leumi,
        CompanyType::Massad,
        CompanyType::Yahav,
        CompanyType::BeyahadBishvilha,
        CompanyType::OneZero,
        CompanyType::Behatsdaa,
        CompanyType::Pagi,
    ];

    /// Identifier used in config files and progress events.
    pub fn id(&self) -> &'static str {
        match self {
            CompanyType::Hapoalim => "hapoalim",
            CompanyType::Beinleumi => "beinleumi",
            CompanyType::Union => "union",
            CompanyType::Amex => "amex",
            CompanyType::Isracard => "isracard",
            CompanyType::VisaCal => "visaCal",
            CompanyType::Max => "max",
            CompanyType::OtsarHahayal => "otsarHahayal",
            CompanyType::Discount => "discount",
            CompanyType::Mercantile => "mercantile",
            CompanyType::Mizrahi => "mizrahi",
            CompanyType::Leumi => "leumi",
            CompanyType::Massad => "massad",
            CompanyType::Yahav => "yahav",
            CompanyType::BeyahadBishvilha => "beyahadBishvilha",
            CompanyType::OneZero => "oneZero",
            CompanyType::Behatsdaa => "behatsdaa",
            CompanyType::Pagi => "pagi",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CompanyType::Hapoalim => "Bank Hapoalim",
            CompanyType::Beinleumi => "Beinleumi",
            CompanyType::Union => "Union",
            CompanyType::Amex => "Amex",
            CompanyType::Isracard => "Isracard",
            CompanyType::VisaCal => "Visa Cal",
            CompanyType::Max => "Max",
            CompanyType::OtsarHahayal => "Bank Otsar Hahayal",
            CompanyType::Discount => "Discount Bank",
            CompanyType::Mercantile => "Mercantile Bank",
            CompanyType::Mizrahi => "Mizrahi Bank",
            CompanyType::Leumi => "Bank Leumi",
            CompanyType::Massad => "Massad",
            CompanyType::Yahav => "Bank Yahav",
            CompanyType::BeyahadBishvilha => "Beyahad Bishvilha",
            CompanyType::OneZero => "One Zero",
            CompanyType::Behatsdaa => "Behatsdaa",
            CompanyType::Pagi => "Pagi",
        }
    }

    pub fn login_fields(&self) -> &'static [LoginField] {
        use LoginField::{Named, Otp};
        match self {
            CompanyType::Hapoalim => &[Named("userCode"), Named("password")],
            CompanyType::Discount | CompanyType::Mercantile => {
                &[Named("id"), Named("password"), Named("num")]
            }
            CompanyType::Isracard | CompanyType::Amex => {
                &[Named("id"), Named("card6Digits"), Named("password")]
            }
            CompanyType::Yahav => &[Named("username"), Named("nationalID"), Named("password")],
            CompanyType::BeyahadBishvilha | CompanyType::Behatsdaa => {
                &[Named("id"), Named("password")]
            }
            CompanyType::OneZero => &[Named("email"), Named("password"), Otp],
            CompanyType::Leumi
            | CompanyType::Mizrahi
            | CompanyType::OtsarHahayal
            | CompanyType::Max
            | CompanyType::VisaCal
            | CompanyType::Union
            | CompanyType::Beinleumi
            | CompanyType::Massad
            | CompanyType::Pagi => &[Named("username"), Named("password")],
        }
    }
}

impl fmt::Display for CompanyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CompanyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompanyType::ALL
            .iter()
            .find(|company| company.id().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown company id: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_str() {
        for company in CompanyType::ALL {
            assert_eq!(company.id().parse::<CompanyType>().unwrap(), company);
        }
        assert_eq!("VISACAL".parse::<CompanyType>().unwrap(), CompanyType::VisaCal);
        assert!("bank-of-nowhere".parse::<CompanyType>().is_err());
    }

    #[test]
    fn serde_uses_company_ids() {
        let json = serde_json::to_string(&CompanyType::OtsarHahayal).unwrap();
        assert_eq!(json, "\"otsarHahayal\"");
    }

    #[test]
    fn one_zero_requires_otp() {
        assert!(CompanyType::OneZero.login_fields().contains(&LoginField::Otp));
        assert!(!CompanyType::Leumi.login_fields().contains(&LoginField::Otp));
    }
}
