use crate::error::RecookieError;

pub fn exit_code_for_error(err: &RecookieError) -> i32 {
    match err {
        RecookieError::Config(_) => 2,
        RecookieError::InvalidDomain(_) => 3,
        RecookieError::Unsupported(_) => 4,
        RecookieError::Io(_) => 23,
        RecookieError::Json(_) => 26,
        RecookieError::FileNotFound(_) => 37,
        RecookieError::Store(_) => 43,
        RecookieError::SyncIncomplete { .. } => 45,
        RecookieError::Settings(_) => 78,
    }
}

#[cfg(test)]
mod tests {
    use super::exit_code_for_error;
    use crate::error::RecookieError;

    #[test]
    fn exit_code_maps_invalid_domain() {
        let err = RecookieError::InvalidDomain("bad".to_string());
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn exit_code_maps_incomplete_sync() {
        let err = RecookieError::SyncIncomplete {
            matched: 3,
            written: 1,
        };
        assert_eq!(exit_code_for_error(&err), 45);
    }
}
