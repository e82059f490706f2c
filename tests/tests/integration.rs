mod xstream_io;
mod xstream_stream;
mod xstream_xrootd;
