/// Strip a trailing `.tif`/`.tiff` so the exported object is `<prefix>.tif`
/// and not `<prefix>.tif.tif`.
pub fn strip_tif_suffix(prefix: &str) -> &str {
    let lower = prefix.to_ascii_lowercase();
    for ext in [".tiff", ".tif"] {
        if lower.ends_with(ext) {
            return &prefix[..prefix.len() - ext.len()];
        }
    }
    prefix
}

/// `gs://` URI of the object an export with this bucket and prefix writes.
pub fn gcs_uri(bucket: &str, prefix: &str) -> String {
    format!("gs://{}/{}.tif", bucket, strip_tif_suffix(prefix))
}
