//! Access and refresh tokens: claims, minting and validation.

pub mod claims;
pub mod issuer;
pub mod token;
pub mod validator;

pub use claims::{Claims, TokenKind};
pub use issuer::{AccessExpiry, TokenIssuer};
pub use token::{SignatureValidated, Token, TokenState, Unvalidated, Validated};
pub use validator::{RevocationLedger, TokenValidator, bearer_token, ensure_not_revoked};
