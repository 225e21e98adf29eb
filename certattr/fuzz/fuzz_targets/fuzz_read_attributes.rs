// Copyright (c) 2026 Intel Corporation
//
// SPDX-License-Identifier: Apache-2.0 or MIT

#![no_main]

use libfuzzer_sys::fuzz_target;

use certattr::attr::{read_attributes, write_attributes};
use certattr::{CertType, CheckOptions, ComplianceLevel};

fuzz_target!(|data: &[u8]| {
    for cert_type in [
        CertType::Certificate,
        CertType::Crl,
        CertType::CertRequest,
        CertType::OcspRequest,
        CertType::CmsAttributes,
    ] {
        for level in [ComplianceLevel::Oblivious, ComplianceLevel::PkixFull] {
            let options = CheckOptions::new().with_compliance_level(level);
            // Re-encode whatever decodes
            if let Ok(mut list) = read_attributes(data, cert_type, &options) {
                let _ = write_attributes(&mut list, cert_type, &options);
            }
        }
    }
});
