use std::env;

/// Runs `f` with the given environment variables set, restoring the previous
/// values afterwards. Callers must be `#[serial]`.
pub fn with_env<F>(vars: &[(&str, &str)], f: F)
where
    F: FnOnce(),
{
    let saved: Vec<(&str, Option<String>)> =
        vars.iter().map(|(key, _)| (*key, env::var(key).ok())).collect();

    for (key, value) in vars {
        env::set_var(key, value);
    }

    f();

    for (key, previous) in saved {
        match previous {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}

/// Runs `f` with the given environment variables removed.
pub fn without_env<F>(keys: &[&str], f: F)
where
    F: FnOnce(),
{
    let saved: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }

    f();

    for (key, previous) in saved {
        if let Some(value) = previous {
            env::set_var(key, value);
        }
    }
}
