use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{FutureExt, SinkExt, StreamExt};
use http::header::{CONNECTION, EXPECT};
use http::{HeaderValue, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::body::{ReqBody, body_channel};
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError};

/// Read buffer reserved per connection
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Serves the requests arriving on one connection.
///
/// The request body is streamed to the handler while the handler runs.
/// Body bytes the handler leaves unread are discarded when they have already
/// arrived, so the next request starts at a message boundary. When the rest
/// of the body is still outstanding, the response goes out with
/// `Connection: close` and the connection ends.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), READ_BUFFER_SIZE),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    /// Runs until the peer closes the connection or a protocol error occurs.
    ///
    /// A malformed request is answered with the status of its [`ParseError`]
    /// before the error is returned.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler<ReqBody>,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    if let ConnectionState::Close = self.do_process(header, payload_size, handler.as_ref()).await? {
                        info!("request body left unfinished, closing connection");
                        return Ok(());
                    }
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("receive payload while expecting a request head");
                    self.do_send_response(build_error_response(StatusCode::BAD_REQUEST), true).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    self.do_send_response(build_error_response(e.status_code()), true).await?;
                    return Err(e.into());
                }

                None => {
                    info!("no more requests, closing connection");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(
        &mut self,
        header: RequestHeader,
        payload_size: PayloadSize,
        handler: &H,
    ) -> Result<ConnectionState, HttpError>
    where
        H: Handler<ReqBody>,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        if header.headers().get(EXPECT).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue")) {
            let writer = self.framed_write.get_mut();
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            info!("receive expect request header, sent continue response");
        }

        let (req_body, mut body_sender) = body_channel(&mut self.framed_read, payload_size);
        let request = header.body(req_body);

        // the handler may wait on body data, so the body is fed concurrently
        let response_result = {
            let request_future = handler.call(request);
            let body_future = body_sender.send_body();
            tokio::pin!(request_future, body_future);

            let mut fed = false;
            loop {
                select! {
                    biased;
                    response = &mut request_future => break response,
                    result = &mut body_future, if !fed => {
                        fed = true;
                        if let Err(e) = result {
                            warn!(cause = %e, "request body ended with error");
                        }
                    }
                }
            }
        };

        // a stalled body must not hold the response back
        let skipped = body_sender.skip_body().now_or_never();
        match skipped {
            Some(Ok(())) => {
                self.send_response(response_result, false).await?;
                Ok(ConnectionState::KeepAlive)
            }
            Some(Err(e)) => {
                self.send_response(response_result, true).await?;
                Err(e.into())
            }
            None => {
                warn!("request body is still incomplete after the handler returned");
                self.send_response(response_result, true).await?;
                Ok(ConnectionState::Close)
            }
        }
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>, close: bool) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response, close).await,
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handle request error");
                self.do_send_response(build_error_response(StatusCode::INTERNAL_SERVER_ERROR), close).await
            }
        }
    }

    async fn do_send_response<T>(&mut self, response: Response<T>, close: bool) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let (mut header_parts, mut body) = response.into_parts();
        if close {
            header_parts.headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }

        let payload_size = match body.size_hint().exact() {
            Some(0) => PayloadSize::Empty,
            Some(length) => PayloadSize::Length(length),
            None => PayloadSize::Chunked,
        };

        let header = Message::<_, T::Data>::Header((ResponseHead::from_parts(header_parts, ()), payload_size));
        self.framed_write.feed(header).await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    // trailers are not written
                    let Ok(data) = frame.into_data() else { continue };
                    self.framed_write.feed(Message::Payload(PayloadItem::Chunk(data))).await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    // send flushes the head and every chunk fed before it
                    self.framed_write.send(Message::Payload(PayloadItem::<T::Data>::Eof)).await?;
                    return Ok(());
                }
            }
        }
    }
}

/// Whether the connection can serve another request.
enum ConnectionState {
    KeepAlive,
    Close,
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::new());
    *response.status_mut() = status_code;
    response
}
