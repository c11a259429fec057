// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The `BtpsStream` seam: lets tests substitute a plain
//! loopback `TcpStream` for the mutual-TLS stream used in production.

use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

pub trait BtpsStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> BtpsStream for T {}

pub type BoxedStream = Pin<Box<dyn BtpsStream>>;
