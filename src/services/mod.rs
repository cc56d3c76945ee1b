// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod google;
pub mod google_oidc;
pub mod identity;
pub mod sign_in;

pub use google::GoogleIdentityProvider;
pub use google_oidc::{GoogleIdTokenVerifier, IdTokenError, VerifiedIdentity};
pub use identity::{AuthenticatedUser, IdentityProvider};
pub use sign_in::{SignInOutcome, SignInService};
