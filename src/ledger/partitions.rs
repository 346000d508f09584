/// Key layout for Fjall partitions
///
/// - `jobs`: job:{task_id} -> TaskRecord (JSON)
/// - `metadata`: meta:{key} -> value (string)

pub const JOBS_PARTITION: &str = "jobs";
pub const METADATA_PARTITION: &str = "metadata";

/// Encode a task key: job:{task_id}
pub fn encode_job_key(task_id: &str) -> Vec<u8> {
    format!("job:{}", task_id).into_bytes()
}

/// Decode a task key: job:{task_id} -> task_id
pub fn decode_job_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("job:").map(String::from)
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_encoding() {
        let key = encode_job_key("0192f0c1-task");
        assert_eq!(key, b"job:0192f0c1-task");
        assert_eq!(decode_job_key(&key).unwrap(), "0192f0c1-task");
    }

    #[test]
    fn test_decode_rejects_foreign_keys() {
        assert!(decode_job_key(b"meta:last_prune_jobs").is_none());
        assert!(decode_job_key(&[0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_meta_key_encoding() {
        assert_eq!(encode_meta_key("last_prune_jobs"), b"meta:last_prune_jobs");
    }
}
