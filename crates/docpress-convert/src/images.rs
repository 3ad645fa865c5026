//! Image source policy
//!
//! External images pass through (optionally re-hosted by the uploader).
//! Small data-URI images stay inline; larger ones go to the uploader and
//! degrade to a link placeholder when no uploader can take them.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use docpress_domain::constants::DATA_URI_INLINE_LIMIT;
use docpress_domain::{Block, ImageSource, ImageUploader, RichText};

/// Outcome of resolving one image source
#[derive(Debug)]
pub enum ResolvedImage {
    /// Emit an image block with this URL
    External(String),
    /// Emit this placeholder instead, with a warning
    Degraded(Block, String),
}

/// Resolve an `img` source attribute into an image block or a placeholder
#[must_use]
pub fn resolve(src: &str, alt: &str, uploader: &dyn ImageUploader) -> ResolvedImage {
    if let Some(rest) = src.strip_prefix("data:") {
        return resolve_data_uri(src, rest, alt, uploader);
    }
    match url::Url::parse(src) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            match uploader.upload(&ImageSource::Url(parsed.to_string())) {
                Ok(hosted) => ResolvedImage::External(hosted),
                Err(_) => degrade(src, alt, "image uploader failed; linked instead"),
            }
        }
        _ => degrade(src, alt, "image source is not an absolute URL; linked instead"),
    }
}

fn resolve_data_uri(
    full: &str,
    rest: &str,
    alt: &str,
    uploader: &dyn ImageUploader,
) -> ResolvedImage {
    let Some((_, payload)) = rest.split_once(",") else {
        return degrade(full, alt, "malformed data URI image dropped to link");
    };
    let decoded_len = if rest.contains(";base64") {
        BASE64.decode(payload.as_bytes()).map(|b| b.len()).ok()
    } else {
        Some(payload.len())
    };
    match decoded_len {
        Some(len) if len <= DATA_URI_INLINE_LIMIT => ResolvedImage::External(full.to_owned()),
        Some(_) => {
            let bytes = if rest.contains(";base64") {
                BASE64.decode(payload.as_bytes()).unwrap_or_default()
            } else {
                payload.as_bytes().to_vec()
            };
            match uploader.upload(&ImageSource::Bytes(bytes)) {
                Ok(hosted) => ResolvedImage::External(hosted),
                Err(_) => degrade_inline(alt, "oversized inline image dropped to placeholder"),
            }
        }
        None => degrade(full, alt, "undecodable data URI image dropped to link"),
    }
}

/// Placeholder paragraph linking to the original source
fn degrade(src: &str, alt: &str, warning: &str) -> ResolvedImage {
    let label = if alt.is_empty() { "image" } else { alt };
    let run = if src.starts_with("http") {
        RichText::linked(format!("[{label}]"), src)
    } else {
        RichText::plain(format!("[{label}]"))
    };
    ResolvedImage::Degraded(
        Block::Paragraph {
            rich_text: vec![run],
            children: Vec::new(),
        },
        warning.to_owned(),
    )
}

/// Placeholder with no link target (nothing reachable to link to)
fn degrade_inline(alt: &str, warning: &str) -> ResolvedImage {
    let label = if alt.is_empty() { "image" } else { alt };
    ResolvedImage::Degraded(
        Block::Paragraph {
            rich_text: vec![RichText::plain(format!("[{label}]"))],
            children: Vec::new(),
        },
        warning.to_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpress_domain::PassthroughUploader;

    #[test]
    fn external_url_passes_through() {
        let resolved = resolve(
            "https://cdn.example.com/pic.png",
            "alt",
            &PassthroughUploader,
        );
        match resolved {
            ResolvedImage::External(url) => assert_eq!(url, "https://cdn.example.com/pic.png"),
            ResolvedImage::Degraded(..) => panic!("expected pass-through"),
        }
    }

    #[test]
    fn small_data_uri_stays_inline() {
        let payload = BASE64.encode(vec![0u8; 128]);
        let uri = format!("data:image/png;base64,{payload}");
        match resolve(&uri, "", &PassthroughUploader) {
            ResolvedImage::External(url) => assert_eq!(url, uri),
            ResolvedImage::Degraded(..) => panic!("small data URI must inline"),
        }
    }

    #[test]
    fn large_data_uri_degrades_without_uploader() {
        let payload = BASE64.encode(vec![0u8; DATA_URI_INLINE_LIMIT + 1]);
        let uri = format!("data:image/png;base64,{payload}");
        match resolve(&uri, "diagram", &PassthroughUploader) {
            ResolvedImage::Degraded(block, warning) => {
                assert_eq!(block.own_text(), "[diagram]");
                assert!(warning.contains("placeholder"));
            }
            ResolvedImage::External(_) => panic!("oversized data URI must degrade"),
        }
    }

    #[test]
    fn relative_src_degrades() {
        match resolve("images/pic.png", "pic", &PassthroughUploader) {
            ResolvedImage::Degraded(block, _) => assert_eq!(block.own_text(), "[pic]"),
            ResolvedImage::External(_) => panic!("relative src must degrade"),
        }
    }
}
