//! Browser fingerprint hardening for the review crawler.
//!
//! This module provides:
//! - Chrome launch arguments (automation flags off, images off)
//! - The init script injected before any page script runs

use std::ffi::OsString;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

pub const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// Chrome arguments for a crawl session.
///
/// Images are disabled for throughput; review text never needs them.
pub fn chrome_args(user_agent: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--disable-blink-features=AutomationControlled",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-infobars",
        "--window-position=0,0",
        "--blink-settings=imagesEnabled=false",
        "--headless=new",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push(OsString::from(format!("--user-agent={}", user_agent)));
    args
}

/// Script run via `Page.addScriptToEvaluateOnNewDocument` on every navigation.
pub fn get_stealth_script() -> String {
    r#"
        // navigator.webdriver is the first thing bot checks look at
        Object.defineProperty(navigator, 'webdriver', {
            get: () => undefined,
        });

        // Headless Chrome ships without window.chrome
        if (!window.chrome) {
            window.chrome = {
                runtime: {
                    connect: function() {
                        return {
                            onMessage: { addListener: function() {}, removeListener: function() {} },
                            postMessage: function() {},
                            disconnect: function() {}
                        };
                    },
                    sendMessage: function() {},
                },
                csi: function() {},
                loadTimes: function() { return {}; }
            };
        }

        const originalQuery = window.navigator.permissions.query;
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications' ?
            Promise.resolve({ state: Notification.permission }) :
            originalQuery(parameters)
        );

        Object.defineProperty(navigator, 'plugins', {
            get: () => {
                const pdf = {
                    description: "Portable Document Format",
                    filename: "internal-pdf-viewer",
                    length: 1,
                    name: "Chrome PDF Plugin"
                };
                const p = [pdf, pdf, pdf];
                Object.setPrototypeOf(p, PluginArray.prototype);
                return p;
            }
        });

        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-US', 'en'],
        });
    "#
    .to_string()
}
