//! Signature deciphering for signed stream formats
//!
//! The platform obscures the playback-authorization signature of some stream
//! formats behind a transformation procedure embedded in its player script.
//! This module reverse-engineers that procedure from the script text alone:
//! the helper-object catalog is classified ([`catalog`]), the transformation
//! function is compiled into an ordered instruction list and interpreted
//! ([`procedure`]), and the result is spliced back into the stream URL here.
//!
//! Everything except [`Decipherer`] is a pure function of its inputs and safe
//! to call from any number of tasks.

mod catalog;
mod procedure;
pub(crate) mod scan;

pub use catalog::OperationKind;
pub use procedure::{CompiledProcedure, ResolvedOperation};

use crate::error::PlayersigError;
use crate::platform::client::PageClient;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

const PROCEDURE_TTL: Duration = Duration::from_secs(600);

/// Fetches player scripts and deciphers signed formats, reusing compiled
/// procedures across requests.
///
/// The cache is keyed by the player-script URL: a new script version gets a
/// new URL and therefore a fresh compile, while repeated formats from the
/// same version skip both the fetch and the parse.
pub struct Decipherer {
    client: PageClient,
    procedures: Cache<String, Arc<CompiledProcedure>>,
}

impl Decipherer {
    pub fn new() -> crate::Result<Self> {
        Ok(Self::with_client(PageClient::new()?))
    }

    pub fn with_client(client: PageClient) -> Self {
        Self {
            client,
            procedures: Cache::builder()
                .time_to_live(PROCEDURE_TTL)
                .max_capacity(16)
                .build(),
        }
    }

    /// Returns the compiled procedure for a player-script URL, fetching and
    /// compiling on cache miss.
    pub async fn procedure_for(&self, script_url: &str) -> crate::Result<Arc<CompiledProcedure>> {
        if let Some(cached) = self.procedures.get(script_url).await {
            debug!(script_url, "procedure cache hit");
            return Ok(cached);
        }
        let body = self.client.fetch_text(script_url).await?;
        let procedure = Arc::new(CompiledProcedure::compile(&body)?);
        self.procedures
            .insert(script_url.to_string(), Arc::clone(&procedure))
            .await;
        Ok(procedure)
    }

    /// Resolves a signed-format descriptor into a playable URL using the
    /// procedure for the given script.
    pub async fn decipher_format(
        &self,
        descriptor: &str,
        script_url: &str,
    ) -> crate::Result<String> {
        let procedure = self.procedure_for(script_url).await?;
        decipher_url(descriptor, &procedure)
    }
}

/// Rebuilds a playable URL from a signed-format descriptor.
///
/// The descriptor is the query-string blob carried by a format that has no
/// direct `url`; it names the base URL, the raw signature and the query
/// parameter the deciphered signature must be appended under.
pub fn decipher_url(descriptor: &str, procedure: &CompiledProcedure) -> crate::Result<String> {
    let format = SignedFormat::parse(descriptor)?;
    let deciphered = procedure.apply(&format.signature)?;
    Ok(reconstruct(&format.url, &format.sig_param, &deciphered))
}

fn reconstruct(url: &str, sig_param: &str, deciphered: &str) -> String {
    format!("{url}&{sig_param}={deciphered}")
}

struct SignedFormat {
    url: String,
    signature: String,
    sig_param: String,
}

impl SignedFormat {
    fn parse(descriptor: &str) -> crate::Result<Self> {
        let mut url = None;
        let mut signature = None;
        let mut sig_param = None;
        for (key, value) in form_urlencoded::parse(descriptor.as_bytes()) {
            match key.as_ref() {
                "url" => url = Some(value.into_owned()),
                "s" => signature = Some(value.into_owned()),
                "sp" => sig_param = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(Self {
            url: url.ok_or(PlayersigError::InvalidCipherParameters("url"))?,
            signature: signature.ok_or(PlayersigError::InvalidCipherParameters("s"))?,
            sig_param: sig_param.ok_or(PlayersigError::InvalidCipherParameters("sp"))?,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! A frozen miniature of the player script's deciphering machinery,
    //! shared by the cipher and metadata tests.

    pub(crate) const SAMPLE_SCRIPT: &str = concat!(
        "var _yxr=77;",
        "var Wq={Ab:function(a){a.reverse()},\n",
        "Cd:function(a,b){return a.slice(b)},\n",
        "Ef:function(a,b){a.splice(0,b)},\n",
        "Gh:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};",
        "ts=function(a){a=a.split(\"\");Wq.Gh(a,3);_yxr+=1;Wq.Ab(a,25);",
        "Wq.Ef(a,2);Wq.Cd(a,1);return a.join(\"\")};",
    );

    /// `SAMPLE_SCRIPT` applied to `"abcdefghij"`.
    pub(crate) const SAMPLE_DECIPHERED: &str = "gfeacbd";
}
