//! Literal builders for field maps and tag sets.

/// Builds a [`Fields`](crate::models::Fields) map from `key => value` pairs.
///
/// Values go through `serde_json::json!`, so anything serializable works.
///
/// ```
/// let fields = telemetry::fields! { "sku" => "A-1", "qty" => 3, "gift" => false };
/// assert_eq!(fields["qty"], 3);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::models::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::models::Fields::new();
        $(
            fields.insert(::std::string::String::from($key), $crate::__private::json!($value));
        )+
        fields
    }};
}

/// Builds a canonical [`Tags`](crate::models::Tags) set from `key => value` pairs.
///
/// ```
/// let tags = telemetry::tags! { "route" => "/cart", "method" => "GET" };
/// assert_eq!(tags.keys().next().map(String::as_str), Some("method"));
/// ```
#[macro_export]
macro_rules! tags {
    () => {
        $crate::models::Tags::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut tags = $crate::models::Tags::new();
        $(
            tags.insert(
                ::std::string::String::from($key),
                ::std::string::ToString::to_string(&$value),
            );
        )+
        tags
    }};
}
