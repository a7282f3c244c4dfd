use baims_api::storage::{
    MockStorageService, S3StorageClient, StorageError, StorageService, sanitize_key,
    submission_photo_key,
};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let key = "submissions/10/photo.jpg";
        let url = mock
            .get_presigned_upload_url(key, "image/jpeg")
            .await
            .unwrap();

        assert!(url.contains("signature=fake"));
        assert!(url.contains(key));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.get_presigned_upload_url("a.jpg", "image/jpeg").await;
        assert!(matches!(result, Err(StorageError::Presign(_))));
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let url = mock
            .get_presigned_upload_url("../../etc/passwd", "text/plain")
            .await
            .unwrap();
        assert!(!url.contains(".."));
    }
}

#[cfg(test)]
mod key_tests {
    use super::*;

    #[test]
    fn test_sanitize_key_drops_traversal_segments() {
        assert_eq!(sanitize_key("a/../b/./c//d"), "a/b/c/d");
        assert_eq!(sanitize_key("/submissions/1/x.png"), "submissions/1/x.png");
    }

    #[test]
    fn test_photo_keys_are_unique_per_project() {
        let first = submission_photo_key(42, "shelf.PNG");
        let second = submission_photo_key(42, "shelf.PNG");
        assert!(first.starts_with("submissions/42/"));
        assert!(first.ends_with(".png"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_photo_key_extension_falls_back_to_bin() {
        assert!(submission_photo_key(1, "no-extension").ends_with(".bin"));
        assert!(submission_photo_key(1, "evil.sh;rm -rf").ends_with(".bin"));
        assert!(!submission_photo_key(1, "../../x.jpg").contains(".."));
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_presigned_url_format() {
        let client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        );

        let key = submission_photo_key(7, "report.jpg");
        let url = client
            .get_presigned_upload_url(&key, "image/jpeg")
            .await
            .unwrap();

        // Presigning is local; no request reaches the endpoint.
        assert!(url.contains("localhost:9000"));
        assert!(url.contains("testbucket"));
        assert!(url.contains(&key));
    }
}
