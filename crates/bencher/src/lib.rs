//! Fixtures shared by the benchmarks.

/// A raw HTTP request loaded from `resources/request`.
#[derive(Debug, Copy, Clone)]
pub struct RequestFile {
    name: &'static str,
    content: &'static str,
}

impl RequestFile {
    pub const fn new(name: &'static str, content: &'static str) -> Self {
        Self { name, content }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }
}

/// A route table shaped like a small REST service, in registration order.
pub const ROUTE_TEMPLATES: &[&str] = &[
    "/",
    "/health",
    "/user",
    "/user/:id",
    "/user/:id/orders",
    "/user/:id/orders/:order",
    "/order",
    "/order/:no",
    "/order/:no/items",
    "/product",
    "/product/:sku",
    "/product/:sku/reviews/:review",
];

/// A path to resolve against [`ROUTE_TEMPLATES`] with `GET`.
#[derive(Debug, Copy, Clone)]
pub struct ResolveCase {
    name: &'static str,
    path: &'static str,
}

impl ResolveCase {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

pub const RESOLVE_CASES: &[ResolveCase] = &[
    ResolveCase { name: "first", path: "/" },
    ResolveCase { name: "param", path: "/user/42" },
    ResolveCase { name: "last", path: "/product/abc-1/reviews/9" },
    ResolveCase { name: "miss", path: "/cart/1" },
];
