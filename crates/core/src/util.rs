use url::Url;

pub trait UrlExt {
    fn with_segments(&self, segments: &[&str]) -> Url;
}

impl UrlExt for Url {
    /// Appends path segments, keeping any existing base path.
    #[inline]
    fn with_segments(&self, segments: &[&str]) -> Url {
        let mut out = self.clone();
        if let Ok(mut path) = out.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        out.set_query(None);
        out.set_fragment(None);
        out
    }
}
