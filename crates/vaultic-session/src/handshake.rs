//! The sign-in handshake pipeline.
//!
//! One complete attempt for `(account, domain, private key, passphrase)`:
//! fetch server keys, build and encrypt the challenge, post it, decrypt
//! and verify the response, validate the returned token pair. Strict step
//! order, each step short-circuits on failure, and nothing here touches
//! session state — publishing the result is the session actor's job, so a
//! cancelled or failed attempt leaves no trace.

use serde::Deserialize;
use tracing::debug;

use vaultic_proto::{
    current_timestamp, decode_rsa_armor, AccountId, ArmoredPrivateKey, ArmoredPublicKey, Jwt,
    Passphrase, ProtocolError, ServerKeys, SignInChallenge, SignInResponse,
};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::tokens::SessionTokens;
use crate::traits::{CryptoOperations, NetworkOperations};

/// Everything one sign-in attempt needs.
#[derive(Debug)]
pub struct SignInRequest {
    /// Account the session is being created for.
    pub account: AccountId,
    /// Server domain the challenge is addressed to.
    pub domain: String,
    /// The account's armored private key.
    pub private_key: ArmoredPrivateKey,
    /// Passphrase unlocking the private key; dropped with the request.
    pub passphrase: Passphrase,
}

/// Token-pair payload returned by the refresh endpoint.
///
/// Same shape as the sign-in response minus the verification token; the
/// refresh exchange carries no challenge to bind to.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    /// Fresh access token (JWT string).
    pub access_token: String,
    /// Replacement refresh token.
    pub refresh_token: String,
}

/// Fetch both server keys concurrently.
///
/// The two fetches are independent network calls; either failing fails
/// the attempt. The returned keys are trusted as-is — no fingerprint
/// continuity check against previously seen keys is performed.
pub async fn fetch_server_keys<N: NetworkOperations>(network: &N) -> Result<ServerKeys> {
    let (pgp_public_key, rsa_public_key) = tokio::try_join!(
        network.fetch_server_pgp_public_key(),
        network.fetch_server_rsa_public_key(),
    )?;
    Ok(ServerKeys {
        pgp_public_key,
        rsa_public_key,
    })
}

/// Validate the decrypted response against the challenge and the server
/// RSA key, in strict order: verification-token echo, challenge expiry,
/// RSA armor decode, RSA signature over the JWT's signed payload. Any
/// single failure aborts — no partial trust.
pub fn verify_sign_in_response<C: CryptoOperations>(
    crypto: &C,
    challenge: &SignInChallenge,
    response: &SignInResponse,
    jwt: &Jwt,
    rsa_public_key: &ArmoredPublicKey,
    now: u64,
) -> Result<()> {
    response.verify_against(challenge, now)?;

    let rsa_der = decode_rsa_armor(rsa_public_key)?;
    let verified = crypto.rsa_verify_signature(jwt.signed_payload(), jwt.signature(), &rsa_der)?;
    if !verified {
        return Err(ProtocolError::SignatureRejected.into());
    }
    Ok(())
}

/// Run one complete sign-in attempt and return the validated token pair.
///
/// # Errors
///
/// Every failure mode of the pipeline: transport, crypto, parse, and
/// verification errors. All are terminal for this attempt; the caller
/// decides whether to start a fresh one (with a fresh challenge).
pub async fn run<N, C>(
    network: &N,
    crypto: &C,
    config: &SessionConfig,
    request: &SignInRequest,
) -> Result<SessionTokens>
where
    N: NetworkOperations,
    C: CryptoOperations,
{
    // Step 1: server keys, fetched fresh and concurrently.
    let server_keys = fetch_server_keys(network).await?;
    debug!(account = %request.account, "fetched server keys");

    // Steps 2-3: fresh challenge, encoded and sealed for the server.
    let challenge = SignInChallenge::new(
        &request.domain,
        current_timestamp(),
        config.challenge_validity_secs,
    );
    let challenge_bytes = challenge.encode()?;
    let armored_challenge = crypto
        .pgp_encrypt_and_sign(
            &challenge_bytes,
            &request.passphrase,
            &request.private_key,
            &server_keys.pgp_public_key,
        )
        .await?;

    // Step 4: the exchange itself.
    let armored_response = network
        .post_sign_in(request.account, &armored_challenge)
        .await?;
    debug!(account = %request.account, "received sign-in response");

    // Step 5: open and authenticate the server's reply.
    let plaintext = crypto
        .pgp_decrypt_and_verify(
            &armored_response,
            &request.passphrase,
            &request.private_key,
            &server_keys.pgp_public_key,
        )
        .await?;

    // Steps 6-7: parse payload and access token.
    let response = SignInResponse::parse(&plaintext)?;
    let jwt = Jwt::parse(&response.access_token)?;

    // Step 8: the full verification chain, against the clock at
    // response-processing time. A response landing after the validity
    // window fails here even if cryptographically valid.
    verify_sign_in_response(
        crypto,
        &challenge,
        &response,
        &jwt,
        &server_keys.rsa_public_key,
        current_timestamp(),
    )?;

    Ok(SessionTokens {
        access_token: jwt,
        refresh_token: response.refresh_token,
    })
}
