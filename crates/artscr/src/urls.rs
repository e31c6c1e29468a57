// ABOUTME: Document URL resolution and RFC 2397 data-URL parsing.
// ABOUTME: Relative candidates are absolutised against the page URL; parse failures leave originals untouched.

use std::ops::Range;

use url::Url;

/// The page URL split into the two prefixes the absolutiser concatenates
/// against: `base_url` is `scheme://authority`, `path_url` additionally
/// carries the document's directory. Built once per extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUrl {
    scheme: String,
    base_url: String,
    path_url: String,
}

impl DocumentUrl {
    /// Parses an absolute document URL. Returns `None` when the string is
    /// not an absolute URL with an authority.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw.trim()).ok()?;
        if !url.has_authority() {
            return None;
        }
        let scheme = url.scheme().to_string();
        let authority = url.authority();
        let base_url = format!("{}://{}", scheme, authority);
        let path = url.path();
        let dir = match path.rfind('/') {
            Some(idx) => &path[..=idx],
            None => "/",
        };
        let path_url = format!("{}{}", base_url, dir);
        Some(Self {
            scheme,
            base_url,
            path_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path_url(&self) -> &str {
        &self.path_url
    }

    /// Resolves `candidate` against this document URL. Returns `None` for
    /// values that must keep their original form: fragments, data URLs,
    /// and already-absolute URLs.
    pub fn try_make_absolute(&self, candidate: &str) -> Option<String> {
        if candidate.is_empty() {
            return Some(self.base_url.clone());
        }
        if let Some(rest) = candidate.strip_prefix("//") {
            return Some(format!("{}://{}", self.scheme, rest));
        }
        if candidate.starts_with('/') {
            return Some(format!("{}{}", self.base_url, candidate));
        }
        if let Some(rest) = candidate.strip_prefix("./") {
            return Some(format!("{}{}", self.path_url, rest));
        }
        if candidate.starts_with('#') {
            return None;
        }
        if DataUrl::parse(candidate).is_some() {
            return None;
        }
        if is_absolute_url(candidate) {
            return None;
        }
        Some(format!("{}{}", self.path_url, candidate))
    }

    /// Resolves every URL inside a `srcset` value, leaving descriptors
    /// (`2x`, `640w`) as written. Returns `None` when nothing changed.
    pub fn try_make_srcset_absolute(&self, srcset: &str) -> Option<String> {
        let mut changed = false;
        let entries: Vec<String> = srcset
            .split(',')
            .map(|entry| {
                let entry = entry.trim();
                let mut parts = entry.splitn(2, char::is_whitespace);
                let url_part = parts.next().unwrap_or("");
                let descriptor = parts.next().map(str::trim);
                match self.try_make_absolute(url_part) {
                    Some(absolute) => {
                        changed = true;
                        match descriptor {
                            Some(d) if !d.is_empty() => format!("{} {}", absolute, d),
                            _ => absolute,
                        }
                    }
                    None => entry.to_string(),
                }
            })
            .collect();
        if changed {
            Some(entries.join(", "))
        } else {
            None
        }
    }
}

fn is_absolute_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok()
}

/// A parsed `data:` URL exposing byte ranges into the original string,
/// per RFC 2397: `data:[<mime>][;<param>=<val>]*[;base64],<data>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime_type: Range<usize>,
    parameters: Vec<Range<usize>>,
    base64: bool,
    data: Range<usize>,
}

impl DataUrl {
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("data:")?;
        let header_start = "data:".len();
        let comma = rest.find(',')?;
        let header = &rest[..comma];
        let data = header_start + comma + 1..raw.len();

        let mut mime_type = header_start..header_start;
        let mut parameters = Vec::new();
        let mut base64 = false;

        for (index, segment) in header.split(';').enumerate() {
            let seg_start = segment_offset(header, segment) + header_start;
            let range = seg_start..seg_start + segment.len();
            if index == 0 {
                if !segment.is_empty() && !segment.contains('/') {
                    return None;
                }
                mime_type = range;
            } else if segment.eq_ignore_ascii_case("base64") {
                base64 = true;
            } else if segment.contains('=') {
                parameters.push(range);
            } else {
                return None;
            }
        }

        Some(Self {
            mime_type,
            parameters,
            base64,
            data,
        })
    }

    pub fn mime_type<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.mime_type.clone()]
    }

    pub fn parameters<'a>(&self, raw: &'a str) -> Vec<&'a str> {
        self.parameters
            .iter()
            .map(|range| &raw[range.clone()])
            .collect()
    }

    pub fn is_base64(&self) -> bool {
        self.base64
    }

    pub fn data<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.data.clone()]
    }

    /// Length in bytes of the data portion.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }
}

fn segment_offset(haystack: &str, needle: &str) -> usize {
    needle.as_ptr() as usize - haystack.as_ptr() as usize
}
