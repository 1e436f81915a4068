// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

#![no_main]

use gradebee::Provider;
use gradebee::services::store::{ConfigStore, KeyValueStore, MemoryStore, STORAGE_KEY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let _ = raw.parse::<Provider>();

    let mut kv = MemoryStore::new();
    if kv.set(STORAGE_KEY, raw.to_string()).is_err() {
        return;
    }

    // A saved blob either loads or is rejected; switching provider must
    // always leave the key empty
    if let Ok(mut store) = ConfigStore::open(kv) {
        let _ = store.set_provider(Provider::Gemini);
        assert!(store.config().api_key.is_empty());
    }
});
